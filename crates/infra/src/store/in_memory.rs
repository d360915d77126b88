use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use storeadmin_core::{Entity, OrderId, OrderItemId, PageWindow, ProductId};
use storeadmin_products::{
    adjust_inventory, ensure_sku_available, NewProduct, Product, ProductChanges, ProductQuery,
};
use storeadmin_sales::{NewOrder, Order, OrderChanges, OrderItem, OrderStatus};

use super::repository::{OrderRepository, ProductRepository, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    last_product_id: i64,
    last_order_id: i64,
    last_item_id: i64,
}

impl State {
    fn product(&self, id: ProductId) -> StoreResult<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| StoreError::product_not_found(id))
    }

    fn sku_owner(&self, sku: &str) -> Option<ProductId> {
        self.products
            .values()
            .find(|p| p.sku == sku)
            .map(|p| p.id)
    }

    fn is_referenced(&self, id: ProductId) -> bool {
        self.orders
            .values()
            .any(|o| o.items.iter().any(|item| item.product_id == id))
    }
}

/// Insert (or replace) a record under its own id.
fn put<E: Entity + Clone>(table: &mut BTreeMap<E::Id, E>, record: &E) {
    table.insert(record.id(), record.clone());
}

/// In-memory product and order store.
///
/// Intended for tests/dev. BTreeMaps keep records in id order, which is the
/// order every listing returns.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.read()?.product(id).cloned()
    }

    async fn find_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.values().find(|p| p.sku == sku).cloned())
    }

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        Ok(query.select(self.read()?.products.values()))
    }

    async fn create_product(&self, input: NewProduct) -> StoreResult<Product> {
        input.validate()?;
        let mut state = self.write()?;
        if state.sku_owner(&input.sku).is_some() {
            return Err(StoreError::Conflict(format!(
                "product with SKU {} already exists",
                input.sku
            )));
        }
        state.last_product_id += 1;
        let product = input.into_product(ProductId::from_raw(state.last_product_id), Utc::now());
        put(&mut state.products, &product);
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> StoreResult<Product> {
        changes.validate()?;
        let mut state = self.write()?;
        let current = state.product(id)?;
        if let Some(sku) = changes.new_sku(current) {
            ensure_sku_available(sku, state.sku_owner(sku), id)?;
        }
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::product_not_found(id))?;
        changes.apply_to(product, Utc::now());
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<Product> {
        let mut state = self.write()?;
        state.product(id)?;
        if state.is_referenced(id) {
            return Err(StoreError::Conflict(format!(
                "product {id} is referenced by existing orders"
            )));
        }
        state
            .products
            .remove(&id)
            .ok_or_else(|| StoreError::product_not_found(id))
    }

    async fn adjust_inventory(&self, id: ProductId, delta: i64) -> StoreResult<Product> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::product_not_found(id))?;
        product.inventory_count = adjust_inventory(product.inventory_count, delta);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn get_order(&self, id: OrderId) -> StoreResult<Order> {
        self.read()?
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::order_not_found(id))
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        window: PageWindow,
    ) -> StoreResult<Vec<Order>> {
        let state = self.read()?;
        let matching = state
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s));
        Ok(window.slice(matching).cloned().collect())
    }

    async fn list_orders_by_customer(&self, email: &str, window: PageWindow) -> StoreResult<Vec<Order>> {
        let state = self.read()?;
        let matching = state.orders.values().filter(|o| o.customer_email == email);
        Ok(window.slice(matching).cloned().collect())
    }

    async fn create_order(&self, input: NewOrder) -> StoreResult<Order> {
        input.validate()?;
        let mut state = self.write()?;
        let (lines, total) = input.price_lines(|id| state.products.get(&id).map(Product::unit_price))?;

        let now = Utc::now();
        state.last_order_id += 1;
        let order_id = OrderId::from_raw(state.last_order_id);
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            state.last_item_id += 1;
            items.push(OrderItem {
                id: OrderItemId::from_raw(state.last_item_id),
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
                created_at: now,
                updated_at: now,
            });
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.inventory_count =
                    adjust_inventory(product.inventory_count, -i64::from(line.quantity));
                product.updated_at = now;
            }
        }

        let customer = input.customer;
        let order = Order {
            id: order_id,
            status: input.status,
            total_amount: total,
            customer_name: customer.customer_name,
            customer_email: customer.customer_email,
            customer_phone: customer.customer_phone,
            shipping_address: customer.shipping_address,
            billing_address: customer.billing_address,
            payment_method: customer.payment_method,
            payment_id: customer.payment_id,
            notes: customer.notes,
            created_at: now,
            updated_at: now,
            items,
        };
        put(&mut state.orders, &order);
        Ok(order)
    }

    async fn update_order(&self, id: OrderId, changes: OrderChanges) -> StoreResult<Order> {
        changes.validate()?;
        let mut state = self.write()?;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::order_not_found(id))?;
        changes.apply_to(order, Utc::now());
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> StoreResult<Order> {
        self.write()?
            .orders
            .remove(&id)
            .ok_or_else(|| StoreError::order_not_found(id))
    }
}
