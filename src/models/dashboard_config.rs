use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BENCHMARK_LABEL, DEFAULT_BENCHMARK_SYMBOL, DEFAULT_CACHE_TTL_SECS, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_PER_MINUTE, DEFAULT_YAHOO_BASE_URL,
};
use crate::utils;

/// Runtime configuration for the dashboard services
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// HTTP port for `serve`
    pub port: u16,

    /// Sector catalog JSON file (None = built-in catalog)
    pub catalog_file: Option<PathBuf>,

    /// Benchmark index symbol, e.g. "^N225"
    pub benchmark_symbol: String,

    /// Benchmark display label, e.g. "Nikkei 225"
    pub benchmark_label: String,

    /// Provider API host
    pub yahoo_base_url: String,

    /// Provider requests allowed per minute
    pub rate_limit_per_minute: u32,

    /// Memoized fetch lifetime in seconds (0 = keep until invalidated)
    pub cache_ttl_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            catalog_file: None,
            benchmark_symbol: DEFAULT_BENCHMARK_SYMBOL.to_string(),
            benchmark_label: DEFAULT_BENCHMARK_LABEL.to_string(),
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl DashboardConfig {
    /// Read configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            port: utils::get_port(),
            catalog_file: utils::get_sector_catalog_file(),
            benchmark_symbol: utils::get_benchmark_symbol(),
            benchmark_label: utils::get_benchmark_label(),
            yahoo_base_url: utils::get_yahoo_base_url(),
            rate_limit_per_minute: utils::get_rate_limit_per_minute(),
            cache_ttl_secs: utils::get_cache_ttl_secs(),
        }
    }

    /// Cache TTL as a duration; None disables expiry
    pub fn cache_ttl(&self) -> Option<Duration> {
        if self.cache_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.cache_ttl_secs))
        }
    }
}
