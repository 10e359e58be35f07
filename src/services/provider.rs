//! Market data provider seams
//!
//! The dashboard only talks to these traits; `YahooClient` is the production
//! implementation and tests plug in an in-memory provider.

use std::future::Future;

use crate::models::{DatedSeries, Period, PriceTable, RawFundamentals};

#[derive(Debug)]
pub enum ProviderError {
    Http(isahc::Error),
    Serialization(serde_json::Error),
    InvalidUrl(url::ParseError),
    InvalidResponse(String),
    /// Session cookie or crumb rejected; the client refreshes it and retries
    Unauthorized,
    RateLimit,
    NoData,
}

impl ProviderError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimit)
    }
}

impl From<isahc::Error> for ProviderError {
    fn from(error: isahc::Error) -> Self {
        ProviderError::Http(error)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        ProviderError::Serialization(error)
    }
}

impl From<url::ParseError> for ProviderError {
    fn from(error: url::ParseError) -> Self {
        ProviderError::InvalidUrl(error)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Http(e) => write!(f, "HTTP error: {}", e),
            ProviderError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ProviderError::InvalidUrl(e) => write!(f, "Invalid URL: {}", e),
            ProviderError::InvalidResponse(s) => write!(f, "Invalid response: {}", s),
            ProviderError::Unauthorized => write!(f, "Unauthorized (session crumb rejected)"),
            ProviderError::RateLimit => write!(f, "Rate limit exceeded"),
            ProviderError::NoData => write!(f, "No data available"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Http(e) => Some(e),
            ProviderError::Serialization(e) => Some(e),
            ProviderError::InvalidUrl(e) => Some(e),
            _ => None,
        }
    }
}

/// Daily closing prices for a set of tickers.
///
/// The returned table is forward-filled and has columns without any data
/// dropped, so callers detect missing tickers by absent columns.
pub trait PriceSeriesProvider: Send + Sync {
    fn fetch_prices(
        &self,
        tickers: &[String],
        period: Period,
    ) -> impl Future<Output = Result<PriceTable, ProviderError>> + Send;
}

/// Daily closing levels of the reference market index
pub trait BenchmarkProvider: Send + Sync {
    fn benchmark_label(&self) -> &str;

    fn fetch_benchmark(
        &self,
        period: Period,
    ) -> impl Future<Output = Result<DatedSeries, ProviderError>> + Send;
}

/// Raw fundamentals of one ticker; `Ok(None)` when the provider knows nothing
pub trait FundamentalsProvider: Send + Sync {
    fn fetch_fundamentals(
        &self,
        ticker: &str,
    ) -> impl Future<Output = Result<Option<RawFundamentals>, ProviderError>> + Send;
}

/// Everything the dashboard needs from one data source
pub trait MarketDataProvider: PriceSeriesProvider + BenchmarkProvider + FundamentalsProvider {}

impl<T> MarketDataProvider for T where T: PriceSeriesProvider + BenchmarkProvider + FundamentalsProvider {}
