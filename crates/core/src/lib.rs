//! `storeadmin-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no storage, no HTTP).

pub mod entity;
pub mod error;
pub mod id;
pub mod pagination;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, OrderItemId, ProductId};
pub use pagination::{has_more, PageLimits, PageWindow, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use value_object::{Currency, Money};
