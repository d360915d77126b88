//! `storeadmin-client`
//!
//! Client-side consumer of the products API:
//! - [`ListController`]: paging, category and search state for a product list
//! - [`DetailLoader`]: one product by id
//! - [`SearchDebouncer`]: search-as-you-type input buffering
//! - [`HttpProductsApi`]: `reqwest` implementation of [`ProductsApi`]
//!
//! The API is the authority; the client only holds read-only copies.

pub mod api;
pub mod debounce;
pub mod detail;
pub mod list;
pub mod ticket;
pub mod types;

pub use api::{ApiError, HttpProductsApi, ProductsApi};
pub use debounce::{spawn_debouncer, SearchDebouncer, DEFAULT_DEBOUNCE};
pub use detail::{DetailLoader, DetailState};
pub use list::{ListController, ListState};
pub use ticket::FetchTicket;
pub use types::{PageRequest, ProductRecord, DEFAULT_PAGE_SIZE};
