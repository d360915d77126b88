//! Single-product loader with the same loading/error/retry shape as the list.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{ApiError, ProductsApi};
use crate::ticket::{FetchTicket, Sequencer};
use crate::types::ProductRecord;

pub type DetailTicket = FetchTicket<i64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailState {
    pub product: Option<ProductRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct DetailLoader<A> {
    api: Arc<A>,
    state: DetailState,
    last_id: Option<i64>,
    sequencer: Sequencer,
}

impl<A: ProductsApi> DetailLoader<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: DetailState::default(),
            last_id: None,
            sequencer: Sequencer::default(),
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn begin_load(&mut self, id: i64) -> DetailTicket {
        if self.last_id != Some(id) {
            self.state.product = None;
        }
        self.last_id = Some(id);
        self.state.loading = true;
        self.state.error = None;
        self.sequencer.issue(id)
    }

    pub fn begin_retry(&mut self) -> Option<DetailTicket> {
        if self.state.loading {
            return None;
        }
        let id = self.last_id?;
        Some(self.begin_load(id))
    }

    pub fn complete(
        &mut self,
        ticket: &DetailTicket,
        outcome: Result<ProductRecord, ApiError>,
    ) -> bool {
        if !self.sequencer.is_current(ticket) {
            debug!(seq = ticket.seq(), "discarding stale product detail");
            return false;
        }
        self.state.loading = false;
        match outcome {
            Ok(product) => {
                self.state.product = Some(product);
                self.state.error = None;
            }
            Err(err) => {
                warn!(product_id = *ticket.request(), error = %err, "product fetch failed");
                self.state.error = Some(err.to_string());
            }
        }
        true
    }

    pub async fn load(&mut self, id: i64) {
        let ticket = self.begin_load(id);
        self.run(ticket).await;
    }

    pub async fn retry(&mut self) {
        if let Some(ticket) = self.begin_retry() {
            self.run(ticket).await;
        }
    }

    async fn run(&mut self, ticket: DetailTicket) {
        let outcome = self.api.get_product(*ticket.request()).await;
        self.complete(&ticket, outcome);
    }
}
