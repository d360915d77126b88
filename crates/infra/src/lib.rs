//! Infrastructure layer: persistence for products and orders.

pub mod store;


pub use store::{
    InMemoryStore, OrderRepository, ProductRepository, SqliteStore, StoreError, StoreResult,
};
