//! Offset pagination shared by the query layer and its consumers.
//!
//! Listings are offset-based (`skip` + `limit`) and carry no total count.
//! Consumers derive "there is probably another page" from whether a page
//! came back full.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on `limit` accepted at the API boundary.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated `(skip, limit)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageWindow {
    /// Number of matching records to skip.
    pub skip: u64,
    /// Maximum number of records to return (always > 0).
    pub limit: u32,
}

impl PageWindow {
    pub fn new(skip: u64, limit: u32) -> DomainResult<Self> {
        if limit == 0 {
            return Err(DomainError::validation("limit must be at least 1"));
        }
        if skip > i64::MAX as u64 {
            return Err(DomainError::validation("skip is out of range"));
        }
        Ok(Self { skip, limit })
    }

    /// Apply the window to an already ordered sequence.
    pub fn slice<I>(&self, ordered: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
    {
        // skip fits in usize on every 64-bit target; saturate elsewhere.
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        ordered.into_iter().skip(skip).take(self.limit as usize)
    }
}

/// The "has more" heuristic: a page that came back exactly full suggests
/// another page exists. A short (or empty) page means the end was reached.
pub fn has_more(returned: usize, page_size: u32) -> bool {
    returned == page_size as usize
}

/// Defaults and bounds for `limit` at an API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_SIZE,
            max_limit: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    pub fn new(default_limit: u32, max_limit: u32) -> DomainResult<Self> {
        if default_limit == 0 || default_limit > max_limit {
            return Err(DomainError::validation(format!(
                "page size {default_limit} must be between 1 and {max_limit}"
            )));
        }
        Ok(Self {
            default_limit,
            max_limit,
        })
    }

    /// Resolve optional query parameters into a window, enforcing bounds.
    pub fn window(&self, skip: Option<u64>, limit: Option<u32>) -> DomainResult<PageWindow> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 || limit > self.max_limit {
            return Err(DomainError::validation(format!(
                "limit must be between 1 and {}",
                self.max_limit
            )));
        }
        PageWindow::new(skip.unwrap_or(0), limit)
    }
}
