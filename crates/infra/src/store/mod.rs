//! Product and order stores.
//!
//! Both backends implement the same repository traits and the same listing
//! contract; `integration_tests` runs one suite against each.

pub mod in_memory;
pub mod repository;
pub mod schema;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use repository::{OrderRepository, ProductRepository, StoreError, StoreResult};
pub use sqlite::SqliteStore;
