use axum::Router;

pub mod orders;
pub mod products;
pub mod system;

/// Router for all resource endpoints (mounted under the API prefix).
///
/// Routes carry their full resource path so that both `/products` and
/// `/products/` resolve once nested.
pub fn router() -> Router {
    Router::new()
        .merge(products::router())
        .merge(orders::router())
}
