use serde::{Deserialize, Deserializer};

use storeadmin_core::{Currency, DomainResult, Money, ProductId};
use storeadmin_products::{NewProduct, Product, ProductChanges};
use storeadmin_sales::{
    CustomerDetails, NewOrder, NewOrderLine, Order, OrderChanges, OrderItem, OrderStatus,
};

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    pub skip: Option<u64>,
    pub limit: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub skip: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersParams {
    pub skip: Option<u64>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Minor units.
    pub price: u64,
    pub price_currency: Option<String>,
    #[serde(default, alias = "stock")]
    pub inventory_count: u32,
    pub sku: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub weight: Option<u32>,
    pub dimensions: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> DomainResult<NewProduct> {
        let currency = match self.price_currency.as_deref() {
            Some(code) => Currency::parse(code)?,
            None => Currency::default(),
        };
        Ok(NewProduct {
            name: self.name,
            description: self.description,
            price: Money::new(self.price, currency),
            inventory_count: self.inventory_count,
            sku: self.sku,
            category: self.category,
            image_url: self.image_url,
            weight: self.weight,
            dimensions: self.dimensions,
            is_active: self.is_active,
        })
    }
}

/// Partial product update. Absent fields are left alone; `null` clears a
/// nullable field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<u64>,
    pub price_currency: Option<String>,
    #[serde(alias = "stock")]
    pub inventory_count: Option<u32>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub weight: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub dimensions: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateProductRequest {
    pub fn into_changes(self) -> DomainResult<ProductChanges> {
        let price_currency = self
            .price_currency
            .as_deref()
            .map(Currency::parse)
            .transpose()?;
        Ok(ProductChanges {
            name: self.name,
            description: self.description,
            price: self.price,
            price_currency,
            inventory_count: self.inventory_count,
            sku: self.sku,
            category: self.category,
            image_url: self.image_url,
            weight: self.weight,
            dimensions: self.dimensions,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub billing_address: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub items: Vec<OrderItemRequest>,
}

impl CreateOrderRequest {
    pub fn into_new_order(self) -> DomainResult<NewOrder> {
        let status = parse_status(self.status.as_deref())?.unwrap_or_default();
        let items = self
            .items
            .into_iter()
            .map(|item| -> DomainResult<NewOrderLine> {
                Ok(NewOrderLine {
                    product_id: ProductId::new(item.product_id)?,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(NewOrder {
            customer: CustomerDetails {
                customer_name: self.customer_name,
                customer_email: self.customer_email,
                customer_phone: self.customer_phone,
                shipping_address: self.shipping_address,
                billing_address: self.billing_address,
                payment_method: self.payment_method,
                payment_id: self.payment_id,
                notes: self.notes,
            },
            status,
            items,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub shipping_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub billing_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub payment_method: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub payment_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl UpdateOrderRequest {
    pub fn into_changes(self) -> DomainResult<OrderChanges> {
        Ok(OrderChanges {
            status: parse_status(self.status.as_deref())?,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            payment_method: self.payment_method,
            payment_id: self.payment_id,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: String,
}

pub fn parse_status(raw: Option<&str>) -> DomainResult<Option<OrderStatus>> {
    raw.map(str::parse::<OrderStatus>).transpose()
}

fn default_true() -> bool {
    true
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(p: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.get(),
        "name": p.name,
        "description": p.description,
        "price": p.price.amount,
        "price_currency": p.price.currency.as_str(),
        "category": p.category,
        "sku": p.sku,
        "inventory_count": p.inventory_count,
        "image_url": p.image_url,
        "weight": p.weight,
        "dimensions": p.dimensions,
        "is_active": p.is_active,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
    })
}

pub fn order_item_to_json(item: &OrderItem) -> serde_json::Value {
    serde_json::json!({
        "id": item.id.get(),
        "order_id": item.order_id.get(),
        "product_id": item.product_id.get(),
        "quantity": item.quantity,
        "unit_price": item.unit_price,
        "subtotal": item.subtotal,
        "created_at": item.created_at.to_rfc3339(),
        "updated_at": item.updated_at.to_rfc3339(),
    })
}

pub fn order_to_json(o: &Order) -> serde_json::Value {
    serde_json::json!({
        "id": o.id.get(),
        "status": o.status.as_str(),
        "total_amount": o.total_amount,
        "customer_name": o.customer_name,
        "customer_email": o.customer_email,
        "customer_phone": o.customer_phone,
        "shipping_address": o.shipping_address,
        "billing_address": o.billing_address,
        "payment_method": o.payment_method,
        "payment_id": o.payment_id,
        "notes": o.notes,
        "created_at": o.created_at.to_rfc3339(),
        "updated_at": o.updated_at.to_rfc3339(),
        "items": o.items.iter().map(order_item_to_json).collect::<Vec<_>>(),
    })
}
