//! Product listing contract: filter + window, ordered by id ascending.
//!
//! Every store implements the same semantics:
//! - records are ordered by `ProductId` ascending (stable across calls),
//! - the filter is applied before the window,
//! - at most `window.limit` records come back, and no total count.

use serde::{Deserialize, Serialize};

use storeadmin_core::PageWindow;

use crate::product::Product;

/// Which products a listing covers. Exactly one filter applies per query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProductFilter {
    #[default]
    All,
    /// Only products whose `is_active` flag equals the value.
    Active(bool),
    /// Exact match on the category label.
    Category(String),
    /// Case-insensitive substring of name or description.
    Search(String),
}

impl ProductFilter {
    /// Build the filter from optional category and search terms.
    ///
    /// Search takes precedence when both are present; blank terms count as
    /// absent.
    pub fn from_terms(category: Option<&str>, search: Option<&str>) -> Self {
        let non_blank = |s: Option<&str>| s.filter(|s| !s.trim().is_empty()).map(str::to_string);
        if let Some(term) = non_blank(search) {
            return Self::Search(term);
        }
        if let Some(category) = non_blank(category) {
            return Self::Category(category);
        }
        Self::All
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Active(active) => product.is_active == *active,
            Self::Category(category) => product.category.as_deref() == Some(category.as_str()),
            Self::Search(term) => {
                contains_ignore_case(&product.name, term)
                    || product
                        .description
                        .as_deref()
                        .is_some_and(|d| contains_ignore_case(d, term))
            }
        }
    }
}

/// A full listing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub window: PageWindow,
}

impl ProductQuery {
    pub fn new(filter: ProductFilter, window: PageWindow) -> Self {
        Self { filter, window }
    }

    /// Run the query over products already ordered by id.
    pub fn select<'a, I>(&self, ordered: I) -> Vec<Product>
    where
        I: IntoIterator<Item = &'a Product>,
    {
        self.window
            .slice(ordered.into_iter().filter(|p| self.filter.matches(p)))
            .cloned()
            .collect()
    }
}

/// ASCII case-insensitive substring test.
///
/// Matches SQLite's `lower()`, which only folds ASCII letters, so every store
/// agrees on what a search returns.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// Escape character used by [`like_pattern`].
pub const LIKE_ESCAPE: char = '\\';

/// `%term%` for a SQL `LIKE ... ESCAPE '\'`, with wildcards in the term
/// matched literally and the term lowercased.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.to_ascii_lowercase().chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storeadmin_core::ProductId;

    use crate::product::NewProduct;

    fn product(id: i64, name: &str, category: Option<&str>, description: Option<&str>) -> Product {
        let mut input = NewProduct::new(name, format!("SKU-{id}"), 100);
        input.category = category.map(str::to_string);
        input.description = description.map(str::to_string);
        input.into_product(ProductId::from_raw(id), Utc::now())
    }

    #[test]
    fn search_takes_precedence_over_category() {
        assert_eq!(
            ProductFilter::from_terms(Some("books"), Some("rust")),
            ProductFilter::Search("rust".to_string())
        );
        assert_eq!(
            ProductFilter::from_terms(Some("books"), None),
            ProductFilter::Category("books".to_string())
        );
        assert_eq!(
            ProductFilter::from_terms(Some("books"), Some("  ")),
            ProductFilter::Category("books".to_string())
        );
        assert_eq!(ProductFilter::from_terms(None, None), ProductFilter::All);
    }

    #[test]
    fn search_matches_name_or_description_ignoring_case() {
        let p = product(1, "Mechanical Keyboard", None, Some("Clicky BROWN switches"));
        assert!(ProductFilter::Search("keyboard".into()).matches(&p));
        assert!(ProductFilter::Search("brown".into()).matches(&p));
        assert!(!ProductFilter::Search("mouse".into()).matches(&p));
    }

    #[test]
    fn category_match_is_exact() {
        let p = product(1, "Novel", Some("books"), None);
        assert!(ProductFilter::Category("books".into()).matches(&p));
        assert!(!ProductFilter::Category("Books".into()).matches(&p));
        assert!(!ProductFilter::Category("book".into()).matches(&p));
    }

    #[test]
    fn active_filter_compares_flag() {
        let mut p = product(1, "Old", None, None);
        p.is_active = false;
        assert!(ProductFilter::Active(false).matches(&p));
        assert!(!ProductFilter::Active(true).matches(&p));
    }

    #[test]
    fn select_filters_before_windowing() {
        let products: Vec<Product> = (1..=30)
            .map(|i| product(i, &format!("Item {i}"), Some(if i % 2 == 0 { "even" } else { "odd" }), None))
            .collect();
        let query = ProductQuery::new(
            ProductFilter::Category("even".into()),
            PageWindow::new(10, 10).unwrap(),
        );
        let page = query.select(&products);
        let ids: Vec<i64> = page.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![22, 24, 26, 28, 30]);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Ab"), "%ab%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
