pub mod api_logging;
pub mod fetch_cache;
pub mod provider;
pub mod yahoo;

#[cfg(test)]
pub mod mock;

pub use api_logging::{log_api_request, ApiPerformanceMetrics, ApiStatus};
pub use fetch_cache::{CacheStats, FetchCache};
pub use provider::{
    BenchmarkProvider, FundamentalsProvider, MarketDataProvider, PriceSeriesProvider, ProviderError,
};
pub use yahoo::{SharedRateLimiter, YahooClient};
