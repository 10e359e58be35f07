//! Dashboard Constants
//!
//! Fixed values shared by the analysis pipeline, the provider client and the
//! HTTP/CLI surfaces.
//!
//! ## Axis domains
//!
//! The comparison grid shares one y-domain per period across every ticker's
//! chart so that the visual scale is comparable:
//!
//! | Step              | Rule                                   |
//! |-------------------|----------------------------------------|
//! | Raw bounds        | min/max over subject, peers, benchmark |
//! | Padding           | 5% of (max - min) on both ends         |
//! | Zero clamp        | min <= 0 <= max                        |
//! | Empty period      | [-10, 10]                              |

use crate::models::Period;

/// Fraction of the raw range added to each end of a comparison domain
pub const AXIS_PADDING_RATIO: f64 = 0.05;

/// Domain used when a period has no data at all
pub const DEFAULT_AXIS_DOMAIN: (f64, f64) = (-10.0, 10.0);

/// Periods of the cross-period comparison grid (1 month, 1 year, 3 years, 5 years)
pub const COMPARISON_PERIODS: [Period; 4] = [
    Period::Month1,
    Period::Year1,
    Period::Year3,
    Period::Year5,
];

/// Default period for the return-over-time chart and the price chart
pub const DEFAULT_CHART_PERIOD: Period = Period::Year5;

/// Reference market index plotted next to every selection
pub const DEFAULT_BENCHMARK_SYMBOL: &str = "^N225";

/// Display name of the reference market index
pub const DEFAULT_BENCHMARK_LABEL: &str = "Nikkei 225";

/// Series name for the peer average line
pub const PEER_AVERAGE_LABEL: &str = "Peer average";

/// Market capitalization is displayed in trillions of the listing currency
pub const MARKET_CAP_DIVISOR: f64 = 1e12;

/// Yahoo Finance API host
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Requests per minute allowed against the provider
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Memoized fetches expire after this many seconds (0 = never)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default HTTP port (matches the port the dashboard UI historically used)
pub const DEFAULT_PORT: u16 = 8501;

/// Placeholder rendered for absent fundamentals values
pub const MISSING_VALUE_PLACEHOLDER: &str = "-";

/// Page that hands out the session cookie required by the quote summary API
pub const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

/// Quote summary modules holding the fundamentals fields
pub const QUOTE_SUMMARY_MODULES: &str = "summaryDetail,defaultKeyStatistics,financialData,price";
