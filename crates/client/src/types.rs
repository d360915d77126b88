//! Wire types shared by the list controller and the REST client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use storeadmin_core::DEFAULT_PAGE_SIZE;

/// Product as returned by the API (matches the response shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Minor units.
    pub price: u64,
    #[serde(default = "default_currency")]
    pub price_currency: String,
    #[serde(default)]
    pub category: Option<String>,
    pub sku: String,
    #[serde(default, alias = "stock")]
    pub inventory_count: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_active() -> bool {
    true
}

/// Which listing endpoint a page request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource<'a> {
    All,
    Category(&'a str),
    Search(&'a str),
}

/// One page of the product list, as the user sees it.
///
/// `page` is 1-based; the wire offset is derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl PageRequest {
    /// First page for the given filters. Blank filters are dropped.
    pub fn first(page_size: u32, category: Option<&str>, search: Option<&str>) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            category: non_blank(category),
            search: non_blank(search),
        }
    }

    /// The same filters, `page` pages in.
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn is_first_page(&self) -> bool {
        self.page <= 1
    }

    /// Search wins over category when both are set.
    pub fn source(&self) -> ListSource<'_> {
        match (&self.search, &self.category) {
            (Some(term), _) => ListSource::Search(term),
            (None, Some(category)) => ListSource::Category(category),
            (None, None) => ListSource::All,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
