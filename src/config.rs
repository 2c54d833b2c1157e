use crate::error::{ApiTrackError, Result};
use crate::types::SearchOptions;
use std::time::Duration;

/// Engine, pagination and cache settings, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Page size used when a search does not ask for one.
    pub default_page_size: usize,
    /// Largest page size a caller may request.
    pub max_page_size: usize,
    /// How long a cached result page stays valid (seconds).
    pub cache_ttl_secs: u64,
    /// Maximum number of cached result pages.
    pub cache_capacity: usize,
    /// Documents scanned per query before the result is marked truncated.
    pub max_scan_documents: usize,
    /// Default case sensitivity for free text and free-valued fields.
    pub case_sensitive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            cache_ttl_secs: 120,
            cache_capacity: 100,
            max_scan_documents: 10_000,
            case_sensitive: false,
        }
    }
}

impl EngineConfig {
    /// Load config from `APITRACK_*` environment variables, falling back to
    /// [`EngineConfig::default`] for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_page_size: env_or("APITRACK_DEFAULT_PAGE_SIZE", defaults.default_page_size),
            max_page_size: env_or("APITRACK_MAX_PAGE_SIZE", defaults.max_page_size),
            cache_ttl_secs: env_or("APITRACK_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            cache_capacity: env_or("APITRACK_CACHE_CAPACITY", defaults.cache_capacity),
            max_scan_documents: env_or("APITRACK_MAX_SCAN_DOCS", defaults.max_scan_documents),
            case_sensitive: std::env::var("APITRACK_CASE_SENSITIVE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.case_sensitive),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(ApiTrackError::Config(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ApiTrackError::Config(format!(
                "default_page_size must be between 1 and {} (got {})",
                self.max_page_size, self.default_page_size
            )));
        }
        if self.max_scan_documents == 0 {
            return Err(ApiTrackError::Config(
                "max_scan_documents must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            case_sensitive: self.case_sensitive,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
