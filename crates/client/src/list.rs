//! Product list controller.
//!
//! Owns paging, filter and search state for one product list. A fetch is
//! split into `begin_*` (state transition, returns a [`FetchTicket`]) and
//! [`ListController::complete`] (applies the outcome) so a UI driver can run
//! the request elsewhere; the async helpers do both in one call.
//!
//! - Page 1 always replaces the list, later pages append.
//! - `has_more` is true iff the last page came back full.
//! - Only the newest ticket's outcome is applied.

use std::sync::Arc;

use serde::Serialize;
use storeadmin_core::has_more;
use tracing::{debug, warn};

use crate::api::{ApiError, ProductsApi};
use crate::ticket::{FetchTicket, Sequencer};
use crate::types::{DEFAULT_PAGE_SIZE, PageRequest, ProductRecord};

pub type ListTicket = FetchTicket<PageRequest>;

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListState {
    pub items: Vec<ProductRecord>,
    pub loading: bool,
    pub error: Option<String>,
    /// Page of the most recent request, 1-based.
    pub page: u32,
    pub has_more: bool,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            page: 1,
            has_more: false,
            category: None,
            search: None,
        }
    }
}

pub struct ListController<A> {
    api: Arc<A>,
    page_size: u32,
    state: ListState,
    loaded_pages: u32,
    last_request: Option<PageRequest>,
    sequencer: Sequencer,
}

impl<A: ProductsApi> ListController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self::with_page_size(api, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(api: Arc<A>, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            state: ListState::default(),
            loaded_pages: 0,
            last_request: None,
            sequencer: Sequencer::default(),
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn last_request(&self) -> Option<&PageRequest> {
        self.last_request.as_ref()
    }

    // -------------------------
    // Transitions
    // -------------------------

    pub fn begin_mount(&mut self) -> ListTicket {
        self.restart()
    }

    pub fn begin_category(&mut self, category: Option<&str>) -> ListTicket {
        self.state.category = category.map(str::to_string);
        self.restart()
    }

    /// `term` is the committed (debounced) search text.
    pub fn begin_search(&mut self, term: Option<&str>) -> ListTicket {
        self.state.search = term.map(str::to_string);
        self.restart()
    }

    /// `None` while loading or when the last page was short.
    pub fn begin_load_more(&mut self) -> Option<ListTicket> {
        if self.state.loading || !self.state.has_more {
            return None;
        }
        let request = self.current_filters().at_page(self.loaded_pages + 1);
        Some(self.issue(request))
    }

    /// Re-issue the identical last request after it failed. `None` while a
    /// fetch is running or when the last fetch succeeded.
    pub fn begin_retry(&mut self) -> Option<ListTicket> {
        if self.state.loading || self.state.error.is_none() {
            return None;
        }
        let request = self.last_request.clone()?;
        if request.is_first_page() {
            self.state.items.clear();
            self.loaded_pages = 0;
        }
        Some(self.issue(request))
    }

    /// Apply a fetch outcome. Returns `false` when the ticket was superseded
    /// and the outcome dropped.
    pub fn complete(
        &mut self,
        ticket: &ListTicket,
        outcome: Result<Vec<ProductRecord>, ApiError>,
    ) -> bool {
        if !self.sequencer.is_current(ticket) {
            debug!(seq = ticket.seq(), "discarding stale product page");
            return false;
        }
        let request = ticket.request();
        self.state.loading = false;
        match outcome {
            Ok(page) => {
                self.state.has_more = has_more(page.len(), request.page_size);
                if request.is_first_page() {
                    self.state.items = page;
                } else {
                    self.state.items.extend(page);
                }
                self.loaded_pages = request.page;
                self.state.error = None;
            }
            Err(err) => {
                warn!(page = request.page, error = %err, "product page fetch failed");
                self.state.error = Some(err.to_string());
            }
        }
        true
    }

    // -------------------------
    // Async helpers
    // -------------------------

    pub async fn mount(&mut self) {
        let ticket = self.begin_mount();
        self.run(ticket).await;
    }

    pub async fn set_category(&mut self, category: Option<&str>) {
        let ticket = self.begin_category(category);
        self.run(ticket).await;
    }

    pub async fn set_search(&mut self, term: Option<&str>) {
        let ticket = self.begin_search(term);
        self.run(ticket).await;
    }

    pub async fn load_more(&mut self) {
        if let Some(ticket) = self.begin_load_more() {
            self.run(ticket).await;
        }
    }

    pub async fn retry(&mut self) {
        if let Some(ticket) = self.begin_retry() {
            self.run(ticket).await;
        }
    }

    async fn run(&mut self, ticket: ListTicket) {
        let outcome = self.api.list_products(ticket.request()).await;
        self.complete(&ticket, outcome);
    }

    fn current_filters(&self) -> PageRequest {
        PageRequest::first(
            self.page_size,
            self.state.category.as_deref(),
            self.state.search.as_deref(),
        )
    }

    fn restart(&mut self) -> ListTicket {
        let request = self.current_filters();
        self.state.category = request.category.clone();
        self.state.search = request.search.clone();
        self.state.items.clear();
        self.state.has_more = false;
        self.loaded_pages = 0;
        self.issue(request)
    }

    fn issue(&mut self, request: PageRequest) -> ListTicket {
        self.state.page = request.page;
        self.state.loading = true;
        self.state.error = None;
        self.last_request = Some(request.clone());
        self.sequencer.issue(request)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::types::ListSource;

    pub(crate) fn record(id: i64, name: &str, category: &str) -> ProductRecord {
        ProductRecord {
            id,
            name: name.to_string(),
            description: None,
            price: 100,
            price_currency: "USD".to_string(),
            category: Some(category.to_string()),
            sku: format!("SKU-{id}"),
            inventory_count: 1,
            image_url: None,
            weight: None,
            dimensions: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    /// Serves a fixed catalog, records every request and can be told to fail.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub catalog: Vec<ProductRecord>,
        pub requests: Mutex<Vec<PageRequest>>,
        pub fail_next: Mutex<Option<ApiError>>,
    }

    impl FakeApi {
        pub(crate) fn with_products(count: i64) -> Self {
            let catalog = (1..=count)
                .map(|i| {
                    let category = if i % 2 == 0 { "even" } else { "odd" };
                    record(i, &format!("Product {i:02}"), category)
                })
                .collect();
            Self {
                catalog,
                ..Default::default()
            }
        }

        pub(crate) fn fail_once(&self, err: ApiError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        pub(crate) fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProductsApi for FakeApi {
        async fn list_products(
            &self,
            request: &PageRequest,
        ) -> Result<Vec<ProductRecord>, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(err) = self.fail_next.lock().unwrap().take() {
                return Err(err);
            }
            let matching = self.catalog.iter().filter(|p| match request.source() {
                ListSource::All => true,
                ListSource::Category(c) => p.category.as_deref() == Some(c),
                ListSource::Search(term) => p.name.to_lowercase().contains(&term.to_lowercase()),
            });
            Ok(matching
                .skip(request.skip() as usize)
                .take(request.page_size as usize)
                .cloned()
                .collect())
        }

        async fn get_product(&self, id: i64) -> Result<ProductRecord, ApiError> {
            if let Some(err) = self.fail_next.lock().unwrap().take() {
                return Err(err);
            }
            self.catalog
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("product {id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeApi;
    use super::*;

    fn ids(state: &ListState) -> Vec<i64> {
        state.items.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn pages_through_twenty_five_products() {
        let mut list = ListController::new(Arc::new(FakeApi::with_products(25)));

        list.mount().await;
        assert_eq!(list.state().items.len(), 10);
        assert!(list.state().has_more);
        assert!(!list.state().loading);

        list.load_more().await;
        assert_eq!(ids(list.state()), (1..=20).collect::<Vec<_>>());
        assert!(list.state().has_more);

        list.load_more().await;
        assert_eq!(list.state().items.len(), 25);
        assert_eq!(list.state().page, 3);
        assert!(!list.state().has_more);

        // nothing more to ask for
        list.load_more().await;
        assert_eq!(list.api().requests().len(), 3);
    }

    #[tokio::test]
    async fn exactly_full_last_page_reports_more() {
        let mut list = ListController::new(Arc::new(FakeApi::with_products(20)));
        list.mount().await;
        list.load_more().await;
        assert!(list.state().has_more);

        list.load_more().await;
        assert!(list.state().items.len() == 20 && !list.state().has_more);
    }

    #[tokio::test]
    async fn filter_change_clears_before_the_result_arrives() {
        let mut list = ListController::new(Arc::new(FakeApi::with_products(25)));
        list.mount().await;
        list.load_more().await;

        let ticket = list.begin_search(Some("product 1"));
        assert!(list.state().items.is_empty());
        assert!(list.state().loading);
        assert_eq!(list.state().page, 1);
        assert_eq!(ticket.request().search.as_deref(), Some("product 1"));

        let outcome = list.api().list_products(ticket.request()).await;
        assert!(list.complete(&ticket, outcome));
        assert_eq!(ids(list.state()), (10..=19).collect::<Vec<_>>());

        list.set_category(Some("even")).await;
        // search still set, so it wins
        assert_eq!(list.api().requests().last().unwrap().search.as_deref(), Some("product 1"));

        list.set_search(None).await;
        assert!(list.state().items.iter().all(|p| p.category.as_deref() == Some("even")));
    }

    #[tokio::test]
    async fn failure_keeps_the_list_and_retry_repeats_the_request() {
        let api = Arc::new(FakeApi::with_products(25));
        let mut list = ListController::new(api.clone());
        list.mount().await;

        api.fail_once(ApiError::Network("connection refused".into()));
        list.load_more().await;
        assert_eq!(list.state().items.len(), 10);
        assert!(!list.state().loading);
        assert_eq!(
            list.state().error.as_deref(),
            Some("network error: connection refused")
        );

        list.retry().await;
        let requests = api.requests();
        assert_eq!(requests[requests.len() - 1], requests[requests.len() - 2]);
        assert_eq!(list.state().items.len(), 20);
        assert!(list.state().error.is_none());
    }

    #[tokio::test]
    async fn load_more_after_failure_resumes_at_the_failed_page() {
        let api = Arc::new(FakeApi::with_products(25));
        let mut list = ListController::new(api.clone());
        list.mount().await;

        api.fail_once(ApiError::Status {
            status: 500,
            message: "boom".into(),
        });
        list.load_more().await;
        list.load_more().await;
        assert_eq!(api.requests().last().unwrap().page, 2);
        assert_eq!(ids(list.state()), (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn stale_responses_are_discarded() {
        let mut list = ListController::new(Arc::new(FakeApi::with_products(25)));

        let slow = list.begin_search(Some("a"));
        let fast = list.begin_search(Some("product 2"));

        let fast_page = list.api().list_products(fast.request()).await;
        assert!(list.complete(&fast, fast_page));
        assert_eq!(list.state().items.len(), 6);

        let stale = vec![fake::record(99, "stale", "odd")];
        assert!(!list.complete(&slow, Ok(stale)));
        assert_eq!(list.state().items.len(), 6);
        assert_eq!(list.state().search.as_deref(), Some("product 2"));
    }

    #[test]
    fn load_more_is_refused_while_loading() {
        let mut list = ListController::new(Arc::new(FakeApi::with_products(25)));
        let _ = list.begin_mount();
        assert!(list.begin_load_more().is_none());
        assert!(list.begin_retry().is_none());
    }

    #[tokio::test]
    async fn retry_after_a_successful_page_changes_nothing() {
        let api = Arc::new(FakeApi::with_products(25));
        let mut list = ListController::new(api.clone());
        list.mount().await;
        list.load_more().await;

        list.retry().await;
        assert_eq!(ids(list.state()), (1..=20).collect::<Vec<_>>());
        assert_eq!(api.requests().len(), 2);
    }

    #[test]
    fn retry_needs_a_previous_request() {
        let mut list = ListController::new(Arc::new(FakeApi::with_products(1)));
        assert!(list.begin_retry().is_none());
    }
}
