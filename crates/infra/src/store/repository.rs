use async_trait::async_trait;
use thiserror::Error;

use storeadmin_core::{DomainError, OrderId, PageWindow, ProductId};
use storeadmin_products::{NewProduct, Product, ProductChanges, ProductQuery};
use storeadmin_sales::{NewOrder, Order, OrderChanges, OrderStatus};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The write conflicts with stored state (duplicate SKU, referenced row).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input rejected by domain rules.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Backend failure. The message is for logs, not for clients.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn product_not_found(id: ProductId) -> Self {
        Self::NotFound(format!("product {id}"))
    }

    pub fn order_not_found(id: OrderId) -> Self {
        Self::NotFound(format!("order {id}"))
    }
}

/// Product persistence plus the listing query.
///
/// Listing follows [`ProductQuery`]: matching records ordered by id
/// ascending, then windowed.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;

    async fn find_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>>;

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;

    /// Fails with `Conflict` when the SKU is taken.
    async fn create_product(&self, input: NewProduct) -> StoreResult<Product>;

    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> StoreResult<Product>;

    /// Returns the removed record. Fails with `Conflict` while any order
    /// still references the product.
    async fn delete_product(&self, id: ProductId) -> StoreResult<Product>;

    /// Add `delta` to the stock level, clamping at zero.
    async fn adjust_inventory(&self, id: ProductId, delta: i64) -> StoreResult<Product>;
}

/// Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get_order(&self, id: OrderId) -> StoreResult<Order>;

    /// Orders by id ascending, optionally restricted to one status.
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        window: PageWindow,
    ) -> StoreResult<Vec<Order>>;

    async fn list_orders_by_customer(&self, email: &str, window: PageWindow) -> StoreResult<Vec<Order>>;

    /// Prices the lines, stores order and items, and decrements stock for
    /// every ordered product, all or nothing.
    async fn create_order(&self, input: NewOrder) -> StoreResult<Order>;

    async fn update_order(&self, id: OrderId, changes: OrderChanges) -> StoreResult<Order>;

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<Order> {
        self.update_order(id, OrderChanges::status_only(status)).await
    }

    /// Removes the order and its items and returns what was removed.
    async fn delete_order(&self, id: OrderId) -> StoreResult<Order>;
}
