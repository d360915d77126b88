use std::sync::Arc;

use storeadmin_core::PageLimits;
use storeadmin_infra::{InMemoryStore, OrderRepository, ProductRepository, SqliteStore, StoreResult};

use crate::config::{AppConfig, StoreBackend};

/// Service identity reported by `/health` and `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: String,
}

impl AppInfo {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            name: "Products and Orders API",
            version: env!("CARGO_PKG_VERSION"),
            environment: environment.into(),
        }
    }
}

/// Everything handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub limits: PageLimits,
    pub info: AppInfo,
}

impl AppServices {
    pub fn in_memory(limits: PageLimits, info: AppInfo) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            products: store.clone(),
            orders: store,
            limits,
            info,
        }
    }

    pub fn sqlite(store: SqliteStore, limits: PageLimits, info: AppInfo) -> Self {
        let store = Arc::new(store);
        Self {
            products: store.clone(),
            orders: store,
            limits,
            info,
        }
    }
}

pub async fn build_services(config: &AppConfig) -> StoreResult<AppServices> {
    let info = AppInfo::new(config.environment.clone());
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Ok(AppServices::in_memory(config.page_limits, info))
        }
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect(&config.database_url).await?;
            tracing::info!(database_url = %config.database_url, "sqlite store ready");
            Ok(AppServices::sqlite(store, config.page_limits, info))
        }
    }
}
