//! Products domain module.
//!
//! Business rules for the catalog, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage). `query` defines the listing contract every
//! store must honour.

pub mod product;
pub mod query;

pub use product::{adjust_inventory, ensure_sku_available, NewProduct, Product, ProductChanges};
pub use query::{ProductFilter, ProductQuery};
