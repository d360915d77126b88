use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeadmin_core::error::{ensure_max_len, ensure_text};
use storeadmin_core::{DomainError, DomainResult, Entity, OrderId, OrderItemId, ProductId};

pub const CUSTOMER_NAME_MAX: usize = 255;
pub const CUSTOMER_EMAIL_MAX: usize = 255;
pub const CUSTOMER_PHONE_MAX: usize = 20;
pub const PAYMENT_METHOD_MAX: usize = 50;
pub const PAYMENT_ID_MAX: usize = 100;

/// Order status lifecycle.
///
/// Any status may be set from any other; the admin surface is trusted to
/// correct mistakes (e.g. re-opening a cancelled order).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown order status: {wanted}")))
    }
}

/// Order line as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub subtotal: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    /// Sum of item subtotals, in minor units.
    pub total_amount: u64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub billing_address: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

/// Customer and payment details shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub billing_address: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub notes: Option<String>,
}

impl CustomerDetails {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_text("customer_name", &self.customer_name, CUSTOMER_NAME_MAX)?;
        ensure_text("customer_email", &self.customer_email, CUSTOMER_EMAIL_MAX)?;
        validate_optional_contact(
            self.customer_phone.as_deref(),
            self.payment_method.as_deref(),
            self.payment_id.as_deref(),
        )
    }
}

/// Requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Overrides the product's current price when set.
    pub unit_price: Option<u64>,
}

/// Line after pricing, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: u64,
    pub subtotal: u64,
}

/// Input for creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer: CustomerDetails,
    pub status: OrderStatus,
    pub items: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn validate(&self) -> DomainResult<()> {
        self.customer.validate()?;
        if self.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        let mut seen = HashSet::with_capacity(self.items.len());
        for line in &self.items {
            if line.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "quantity for product {} must be greater than zero",
                    line.product_id
                )));
            }
            if !seen.insert(line.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears more than once",
                    line.product_id
                )));
            }
        }
        Ok(())
    }

    /// Price every line and compute the order total.
    ///
    /// `current_price` returns the product's current unit price, or `None`
    /// when the product does not exist.
    pub fn price_lines<F>(&self, mut current_price: F) -> DomainResult<(Vec<PricedLine>, u64)>
    where
        F: FnMut(ProductId) -> Option<u64>,
    {
        let mut priced = Vec::with_capacity(self.items.len());
        let mut total: u64 = 0;
        for line in &self.items {
            let known = current_price(line.product_id).ok_or_else(|| {
                DomainError::validation(format!("product {} does not exist", line.product_id))
            })?;
            let unit_price = line.unit_price.unwrap_or(known);
            let subtotal = unit_price
                .checked_mul(u64::from(line.quantity))
                .ok_or_else(|| DomainError::invariant("line subtotal overflows"))?;
            total = total
                .checked_add(subtotal)
                .ok_or_else(|| DomainError::invariant("order total overflows"))?;
            priced.push(PricedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
                subtotal,
            });
        }
        Ok((priced, total))
    }
}

/// Partial order update; items are immutable once placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChanges {
    pub status: Option<OrderStatus>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<Option<String>>,
    pub shipping_address: Option<Option<String>>,
    pub billing_address: Option<Option<String>>,
    pub payment_method: Option<Option<String>>,
    pub payment_id: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl OrderChanges {
    pub fn status_only(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.customer_name {
            ensure_text("customer_name", name, CUSTOMER_NAME_MAX)?;
        }
        if let Some(email) = &self.customer_email {
            ensure_text("customer_email", email, CUSTOMER_EMAIL_MAX)?;
        }
        validate_optional_contact(
            self.customer_phone.as_ref().and_then(|p| p.as_deref()),
            self.payment_method.as_ref().and_then(|m| m.as_deref()),
            self.payment_id.as_ref().and_then(|p| p.as_deref()),
        )
    }

    pub fn apply_to(self, order: &mut Order, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(name) = self.customer_name {
            order.customer_name = name;
        }
        if let Some(email) = self.customer_email {
            order.customer_email = email;
        }
        if let Some(phone) = self.customer_phone {
            order.customer_phone = phone;
        }
        if let Some(address) = self.shipping_address {
            order.shipping_address = address;
        }
        if let Some(address) = self.billing_address {
            order.billing_address = address;
        }
        if let Some(method) = self.payment_method {
            order.payment_method = method;
        }
        if let Some(payment_id) = self.payment_id {
            order.payment_id = payment_id;
        }
        if let Some(notes) = self.notes {
            order.notes = notes;
        }
        order.updated_at = now;
    }
}

fn validate_optional_contact(
    phone: Option<&str>,
    payment_method: Option<&str>,
    payment_id: Option<&str>,
) -> DomainResult<()> {
    if let Some(phone) = phone {
        ensure_max_len("customer_phone", phone, CUSTOMER_PHONE_MAX)?;
    }
    if let Some(method) = payment_method {
        ensure_max_len("payment_method", method, PAYMENT_METHOD_MAX)?;
    }
    if let Some(id) = payment_id {
        ensure_max_len("payment_id", id, PAYMENT_ID_MAX)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn customer() -> CustomerDetails {
        CustomerDetails {
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            ..Default::default()
        }
    }

    fn line(product: i64, quantity: u32) -> NewOrderLine {
        NewOrderLine {
            product_id: ProductId::from_raw(product),
            quantity,
            unit_price: None,
        }
    }

    fn order(items: Vec<NewOrderLine>) -> NewOrder {
        NewOrder {
            customer: customer(),
            status: OrderStatus::default(),
            items,
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(" refunded ".parse::<OrderStatus>().unwrap(), OrderStatus::Refunded);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn order_requires_items_and_positive_quantities() {
        assert!(order(vec![]).validate().is_err());
        assert!(order(vec![line(1, 0)]).validate().is_err());
        assert!(order(vec![line(1, 2)]).validate().is_ok());
    }

    #[test]
    fn order_rejects_repeated_product() {
        let err = order(vec![line(1, 1), line(1, 3)]).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn order_rejects_bad_customer_fields() {
        let mut input = order(vec![line(1, 1)]);
        input.customer.customer_email = " ".to_string();
        assert!(input.validate().is_err());

        let mut input = order(vec![line(1, 1)]);
        input.customer.customer_phone = Some("0".repeat(CUSTOMER_PHONE_MAX + 1));
        assert!(input.validate().is_err());
    }

    #[test]
    fn pricing_uses_current_price_unless_overridden() {
        let prices = HashMap::from([(ProductId::from_raw(1), 250u64), (ProductId::from_raw(2), 1_000)]);
        let mut input = order(vec![line(1, 4), line(2, 1)]);
        input.items[1].unit_price = Some(900);

        let (lines, total) = input.price_lines(|id| prices.get(&id).copied()).unwrap();
        assert_eq!(lines[0].unit_price, 250);
        assert_eq!(lines[0].subtotal, 1_000);
        assert_eq!(lines[1].unit_price, 900);
        assert_eq!(total, 1_900);
    }

    #[test]
    fn pricing_unknown_product_is_validation_error() {
        let err = order(vec![line(7, 1)]).price_lines(|_| None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn changes_update_status_and_clear_notes() {
        let now = Utc::now();
        let mut stored = Order {
            id: OrderId::from_raw(1),
            status: OrderStatus::Pending,
            total_amount: 10,
            customer_name: "Ada".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: None,
            shipping_address: None,
            billing_address: None,
            payment_method: None,
            payment_id: None,
            notes: Some("gift".to_string()),
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };
        let later = now + chrono::Duration::seconds(1);
        OrderChanges {
            status: Some(OrderStatus::Shipped),
            notes: Some(None),
            ..Default::default()
        }
        .apply_to(&mut stored, later);

        assert_eq!(stored.status, OrderStatus::Shipped);
        assert_eq!(stored.notes, None);
        assert_eq!(stored.customer_name, "Ada");
        assert_eq!(stored.updated_at, later);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the order total is the sum of line subtotals.
            #[test]
            fn total_is_sum_of_subtotals(
                lines in proptest::collection::vec((1u32..1_000, 0u64..1_000_000), 1..20)
            ) {
                let items: Vec<NewOrderLine> = lines
                    .iter()
                    .enumerate()
                    .map(|(i, (quantity, price))| NewOrderLine {
                        product_id: ProductId::from_raw(i as i64 + 1),
                        quantity: *quantity,
                        unit_price: Some(*price),
                    })
                    .collect();
                let input = order(items);
                prop_assert!(input.validate().is_ok());

                let (priced, total) = input.price_lines(|_| Some(0)).unwrap();
                let sum: u64 = priced.iter().map(|l| l.subtotal).sum();
                prop_assert_eq!(total, sum);
                for l in &priced {
                    prop_assert_eq!(l.subtotal, l.unit_price * u64::from(l.quantity));
                }
            }
        }
    }
}
