//! REST bindings for the products API.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use thiserror::Error;

use crate::types::{ListSource, PageRequest, ProductRecord};

pub const API_URL_ENV: &str = "STOREADMIN_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Everything a fetch can fail with. The UI only ever sees `to_string()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait ProductsApi: Send + Sync {
    async fn list_products(&self, request: &PageRequest) -> Result<Vec<ProductRecord>, ApiError>;

    async fn get_product(&self, id: i64) -> Result<ProductRecord, ApiError>;
}

/// `ProductsApi` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProductsApi {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpProductsApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Network(format!("invalid API url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Network(format!("invalid API url {base_url}")));
        }
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    /// Reads `STOREADMIN_API_URL`, falling back to the local default.
    pub fn from_env() -> Result<Self, ApiError> {
        let url = std::env::var(API_URL_ENV).unwrap_or_else(|_| {
            tracing::info!("{API_URL_ENV} not set, using default: {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        Self::new(&url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("invalid API url {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn list_url(&self, request: &PageRequest) -> Result<Url, ApiError> {
        let (mut url, search) = match request.source() {
            ListSource::All => (self.endpoint(&["products"])?, None),
            ListSource::Category(category) => {
                (self.endpoint(&["products", "category", category])?, None)
            }
            ListSource::Search(term) => (self.endpoint(&["products", "search"])?, Some(term)),
        };
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(term) = search {
                pairs.append_pair("query", term);
            }
            pairs
                .append_pair("skip", &request.skip().to_string())
                .append_pair("limit", &request.page_size.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl ProductsApi for HttpProductsApi {
    async fn list_products(&self, request: &PageRequest) -> Result<Vec<ProductRecord>, ApiError> {
        let url = self.list_url(request)?;
        tracing::debug!(%url, page = request.page, "fetching products");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn get_product(&self, id: i64) -> Result<ProductRecord, ApiError> {
        let url = self.endpoint(&["products", &id.to_string()])?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("product {id}")));
        }
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Prefer the `message` of a JSON error body; fall back to the raw text.
async fn status_error(resp: reqwest::Response) -> ApiError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    ApiError::Status { status, message }
}
