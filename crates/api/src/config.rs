//! Process configuration, read once from the environment at startup.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

use storeadmin_core::{PageLimits, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://storeadmin.db?mode=rwc";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:8000,http://localhost:3000";
pub const DEFAULT_ENVIRONMENT: &str = "development";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which store backs the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("expected \"sqlite\" or \"memory\", got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: String,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub backend: StoreBackend,
    pub page_limits: PageLimits,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            backend: StoreBackend::Sqlite,
            page_limits: PageLimits::default(),
            cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let default_limit: u32 = parse("PAGE_SIZE", var("PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string()))?;
        let max_limit: u32 = parse("MAX_PAGE_SIZE", var("MAX_PAGE_SIZE", &MAX_PAGE_SIZE.to_string()))?;
        let page_limits = PageLimits::new(default_limit, max_limit).map_err(|e| ConfigError::Invalid {
            key: "PAGE_SIZE",
            value: default_limit.to_string(),
            reason: e.to_string(),
        })?;

        let config = Self {
            environment: var("APP_ENV", DEFAULT_ENVIRONMENT),
            bind_addr: parse("BIND_ADDR", var("BIND_ADDR", DEFAULT_BIND_ADDR))?,
            database_url: var("DATABASE_URL", DEFAULT_DATABASE_URL),
            backend: parse("STORE_BACKEND", var("STORE_BACKEND", "sqlite"))?,
            page_limits,
            cors_origins: split_origins(&var("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
        };
        if config.cors_origins.iter().any(|o| o == "*") {
            warn!("CORS_ORIGINS allows any origin");
        }
        Ok(config)
    }

    /// In-memory store on an ephemeral local port.
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }
}

fn parse<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.page_limits.default_limit, 10);
        assert_eq!(config.page_limits.max_limit, 100);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn values_are_parsed() {
        let config = config_from(&[
            ("APP_ENV", "production"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("STORE_BACKEND", "memory"),
            ("PAGE_SIZE", "20"),
            ("CORS_ORIGINS", "https://admin.example.com, *"),
        ])
        .unwrap();
        assert_eq!(config.environment, "production");
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.page_limits.default_limit, 20);
        assert_eq!(config.cors_origins, vec!["https://admin.example.com", "*"]);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            config_from(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
        assert!(config_from(&[("STORE_BACKEND", "postgres")]).is_err());
        assert!(config_from(&[("PAGE_SIZE", "0")]).is_err());
        assert!(config_from(&[("PAGE_SIZE", "50"), ("MAX_PAGE_SIZE", "20")]).is_err());
    }
}
