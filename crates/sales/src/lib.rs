//! Orders domain module.
//!
//! This crate contains business rules for customer orders, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    CustomerDetails, NewOrder, NewOrderLine, Order, OrderChanges, OrderItem, OrderStatus,
    PricedLine,
};
