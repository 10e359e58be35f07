use chrono::{DateTime, NaiveDate};
use isahc::{config::Configurable, prelude::*, HttpClient};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, SystemTime};
use tokio::sync::Mutex as TokioMutex;
use tokio::time::sleep;
use url::Url;

use crate::constants::{QUOTE_SUMMARY_MODULES, YAHOO_COOKIE_URL};
use crate::models::{DashboardConfig, DatedSeries, Period, PriceTable, RawFundamentals, SeriesTable};
use crate::services::provider::{
    BenchmarkProvider, FundamentalsProvider, PriceSeriesProvider, ProviderError,
};

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Quote summary modules in lookup priority order
const SUMMARY_MODULES: [&str; 4] = ["financialData", "defaultKeyStatistics", "summaryDetail", "price"];

/// Shared rate limiter for provider requests across all concurrent tasks
#[derive(Debug)]
pub struct SharedRateLimiter {
    /// Timestamps of recent requests (sliding window)
    request_timestamps: TokioMutex<Vec<SystemTime>>,
    /// Maximum requests allowed per minute
    rate_limit_per_minute: u32,
}

impl SharedRateLimiter {
    pub fn new(rate_limit_per_minute: u32) -> Self {
        Self {
            request_timestamps: TokioMutex::new(Vec::new()),
            rate_limit_per_minute: rate_limit_per_minute.max(1),
        }
    }

    /// Sliding-window limit; sleeps until the oldest request leaves the window
    pub async fn enforce_rate_limit(&self) {
        let current_time = SystemTime::now();
        let mut timestamps = self.request_timestamps.lock().await;

        timestamps.retain(|&timestamp| {
            current_time
                .duration_since(timestamp)
                .unwrap_or(StdDuration::from_secs(0))
                < StdDuration::from_secs(60)
        });

        if timestamps.len() >= self.rate_limit_per_minute as usize {
            if let Some(&oldest_request) = timestamps.first() {
                let elapsed = current_time
                    .duration_since(oldest_request)
                    .unwrap_or(StdDuration::from_secs(0));
                let wait_time = StdDuration::from_secs(60).saturating_sub(elapsed);

                if !wait_time.is_zero() {
                    // Drop lock before sleeping so other tasks can check the window
                    drop(timestamps);
                    tracing::debug!("Rate limiter waiting {:.1}s", wait_time.as_secs_f64());
                    sleep(wait_time + StdDuration::from_millis(100)).await;
                    let mut timestamps = self.request_timestamps.lock().await;
                    timestamps.push(SystemTime::now());
                    return;
                }
            }
        }

        timestamps.push(current_time);
    }
}

/// Yahoo Finance client: daily chart history and quote summary fundamentals
#[derive(Clone)]
pub struct YahooClient {
    client: HttpClient,
    base_url: Url,
    random_agent: bool,
    rate_limiter: Arc<SharedRateLimiter>,
    /// Session crumb for the quote summary API, fetched on first use
    crumb: Arc<TokioMutex<Option<String>>>,
    benchmark_symbol: String,
    benchmark_label: String,
}

impl YahooClient {
    pub fn new(config: &DashboardConfig) -> Result<Self, ProviderError> {
        let limiter = Arc::new(SharedRateLimiter::new(config.rate_limit_per_minute));
        Self::with_options(
            &config.yahoo_base_url,
            true,
            limiter,
            &config.benchmark_symbol,
            &config.benchmark_label,
        )
    }

    pub fn with_options(
        base_url: &str,
        random_agent: bool,
        rate_limiter: Arc<SharedRateLimiter>,
        benchmark_symbol: &str,
        benchmark_label: &str,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        let client = HttpClient::builder()
            .timeout(StdDuration::from_secs(30))
            .cookies()
            .build()?;

        tracing::info!(
            "YahooClient initialized (base_url={}, benchmark={})",
            base_url,
            benchmark_symbol
        );

        Ok(YahooClient {
            client,
            base_url,
            random_agent,
            rate_limiter,
            crumb: Arc::new(TokioMutex::new(None)),
            benchmark_symbol: benchmark_symbol.to_string(),
            benchmark_label: benchmark_label.to_string(),
        })
    }

    pub fn benchmark_symbol(&self) -> &str {
        &self.benchmark_symbol
    }

    /// API URL under the base: path segments are escaped, query pairs form-encoded
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidResponse(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    fn get_user_agent(&self) -> &'static str {
        if self.random_agent {
            use rand::seq::SliceRandom;
            USER_AGENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(USER_AGENTS[0])
        } else {
            USER_AGENTS[0]
        }
    }

    fn build_get(&self, url: &str) -> Result<isahc::Request<()>, ProviderError> {
        isahc::Request::builder()
            .uri(url)
            .method("GET")
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "en-US,en;q=0.9,ja;q=0.8")
            .header("User-Agent", self.get_user_agent())
            .body(())
            .map_err(|e| ProviderError::InvalidResponse(format!("Request build error: {}", e)))
    }

    /// GET a JSON document with retries.
    ///
    /// 429 surfaces immediately as `RateLimit`, 401 as `Unauthorized` and
    /// 404 as `NoData`. Server and network errors are retried with backoff.
    async fn make_request(&self, url: &str) -> Result<Value, ProviderError> {
        const MAX_RETRIES: u32 = 3;

        let mut last_error: Option<String> = None;

        for attempt in 0..MAX_RETRIES {
            self.rate_limiter.enforce_rate_limit().await;

            if attempt > 0 {
                let delay = StdDuration::from_secs_f64(
                    2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>(),
                );
                let delay = delay.min(StdDuration::from_secs(60));
                let reason = last_error.as_deref().unwrap_or("unknown error");
                tracing::info!(
                    "Yahoo retry backoff: attempt {}/{} - reason: {}, waiting {:.1}s before retry",
                    attempt + 1,
                    MAX_RETRIES,
                    reason,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }

            tracing::debug!("YAHOO_REQUEST: attempt={}, url={}", attempt + 1, url);

            let request = self.build_get(url)?;
            match self.client.send_async(request).await {
                Ok(mut resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let text = match resp.text().await {
                            Ok(text) => text,
                            Err(e) => {
                                last_error = Some(format!("Response body error: {}", e));
                                continue;
                            }
                        };
                        return serde_json::from_str::<Value>(&text).map_err(ProviderError::from);
                    }

                    let status_text = status.canonical_reason().unwrap_or("Unknown");
                    match status.as_u16() {
                        429 => {
                            tracing::warn!("Yahoo rate limited request: {}", url);
                            return Err(ProviderError::RateLimit);
                        }
                        401 => return Err(ProviderError::Unauthorized),
                        404 => return Err(ProviderError::NoData),
                        _ if status.is_server_error() => {
                            last_error = Some(format!("Server error ({}) - {}", status.as_u16(), status_text));
                            continue;
                        }
                        code => {
                            return Err(ProviderError::InvalidResponse(format!(
                                "Client error ({}) - {} - not retryable",
                                code, status_text
                            )));
                        }
                    }
                }
                Err(e) => {
                    last_error = Some(format!("Network error: {}", e));
                    continue;
                }
            }
        }

        Err(ProviderError::InvalidResponse(format!(
            "Max retries exceeded: {}",
            last_error.unwrap_or_else(|| "unknown error".to_string())
        )))
    }

    /// Daily closes of one symbol over `period`
    pub async fn fetch_chart(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<(NaiveDate, Option<f64>)>, ProviderError> {
        let url = self.endpoint(
            &["v8", "finance", "chart", symbol],
            &[("range", period.code()), ("interval", "1d")],
        )?;
        let data = self.make_request(&url).await?;
        let observations = parse_chart(&data)?;
        tracing::debug!("Fetched {} daily closes for {} ({})", observations.len(), symbol, period);
        Ok(observations)
    }

    /// Current session crumb; a fresh one is fetched when absent or forced
    async fn crumb(&self, force_refresh: bool) -> Result<String, ProviderError> {
        let mut guard = self.crumb.lock().await;
        if !force_refresh {
            if let Some(crumb) = guard.as_ref() {
                return Ok(crumb.clone());
            }
        }

        // The cookie page answers 404 but still sets the session cookie
        self.rate_limiter.enforce_rate_limit().await;
        let request = self.build_get(YAHOO_COOKIE_URL)?;
        if let Err(e) = self.client.send_async(request).await {
            tracing::warn!("Session cookie request failed: {}", e);
        }

        self.rate_limiter.enforce_rate_limit().await;
        let request = self.build_get(&self.endpoint(&["v1", "test", "getcrumb"], &[])?)?;
        let mut resp = self.client.send_async(request).await?;
        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimit);
        }
        if !status.is_success() {
            return Err(ProviderError::InvalidResponse(format!(
                "Crumb request failed ({})",
                status.as_u16()
            )));
        }

        let crumb = resp
            .text()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Crumb body error: {}", e)))?
            .trim()
            .to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(ProviderError::InvalidResponse("Crumb response was not a crumb".to_string()));
        }

        tracing::info!("Obtained quote summary session crumb");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }
}

impl PriceSeriesProvider for YahooClient {
    async fn fetch_prices(&self, tickers: &[String], period: Period) -> Result<PriceTable, ProviderError> {
        let mut series = Vec::with_capacity(tickers.len());

        for ticker in tickers {
            match self.fetch_chart(ticker, period).await {
                Ok(observations) => series.push((ticker.clone(), observations)),
                Err(e @ (ProviderError::NoData | ProviderError::InvalidResponse(_))) => {
                    tracing::warn!("No price history for {} ({}): {}", ticker, period, e);
                    series.push((ticker.clone(), Vec::new()));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(SeriesTable::from_observations(series)
            .forward_fill()
            .drop_empty_columns())
    }
}

impl BenchmarkProvider for YahooClient {
    fn benchmark_label(&self) -> &str {
        &self.benchmark_label
    }

    async fn fetch_benchmark(&self, period: Period) -> Result<DatedSeries, ProviderError> {
        let observations = self.fetch_chart(&self.benchmark_symbol, period).await?;
        let (dates, values): (Vec<NaiveDate>, Vec<Option<f64>>) = observations.into_iter().unzip();
        let series = DatedSeries {
            name: self.benchmark_label.clone(),
            dates,
            values,
        }
        .forward_fill();

        if !series.has_data() {
            return Err(ProviderError::NoData);
        }
        Ok(series)
    }
}

impl FundamentalsProvider for YahooClient {
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Option<RawFundamentals>, ProviderError> {
        let mut refreshed = false;

        loop {
            let crumb = self.crumb(refreshed).await?;
            let url = self.endpoint(
                &["v10", "finance", "quoteSummary", ticker],
                &[("modules", QUOTE_SUMMARY_MODULES), ("crumb", crumb.as_str())],
            )?;

            match self.make_request(&url).await {
                Ok(data) => return parse_quote_summary(&data),
                Err(ProviderError::Unauthorized) if !refreshed => {
                    tracing::info!("Quote summary crumb rejected, refreshing");
                    refreshed = true;
                }
                Err(ProviderError::NoData) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Extract `(date, close)` pairs from a v8 chart response.
///
/// Adjusted closes are used when present. Timestamps are shifted by the
/// exchange's GMT offset before taking the date; a later point on the same
/// date replaces an earlier one.
pub fn parse_chart(data: &Value) -> Result<Vec<(NaiveDate, Option<f64>)>, ProviderError> {
    if let Some(description) = data["chart"]["error"]["description"].as_str() {
        tracing::debug!("Chart error: {}", description);
        return Err(ProviderError::NoData);
    }

    let result = data["chart"]["result"].get(0).ok_or(ProviderError::NoData)?;
    let offset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);

    let timestamps = match result["timestamp"].as_array() {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Err(ProviderError::NoData),
    };

    let closes = result["indicators"]["adjclose"][0]["adjclose"]
        .as_array()
        .or_else(|| result["indicators"]["quote"][0]["close"].as_array())
        .ok_or_else(|| ProviderError::InvalidResponse("Chart has no close prices".to_string()))?;

    if closes.len() != timestamps.len() {
        return Err(ProviderError::InvalidResponse(format!(
            "Chart has {} timestamps but {} closes",
            timestamps.len(),
            closes.len()
        )));
    }

    let mut by_date: BTreeMap<NaiveDate, Option<f64>> = BTreeMap::new();
    for (ts, close) in timestamps.iter().zip(closes) {
        let Some(date) = ts
            .as_i64()
            .and_then(|t| DateTime::from_timestamp(t + offset, 0))
            .map(|dt| dt.date_naive())
        else {
            continue;
        };
        by_date.insert(date, close.as_f64().filter(|c| c.is_finite()));
    }

    Ok(by_date.into_iter().collect())
}

/// Flatten the quote summary modules into raw fundamentals.
///
/// Fields are either plain numbers or `{"raw": .., "fmt": ..}` objects; the
/// first module that carries a key wins. `summaryDetail.dividendYield` is a
/// fraction and is scaled to a percentage here.
pub fn parse_quote_summary(data: &Value) -> Result<Option<RawFundamentals>, ProviderError> {
    let Some(result) = data["quoteSummary"]["result"].get(0) else {
        return Ok(None);
    };

    let mut flat = Map::new();
    for module in SUMMARY_MODULES {
        let Some(fields) = result[module].as_object() else {
            continue;
        };
        for (key, field) in fields {
            if flat.contains_key(key) {
                continue;
            }
            if let Some(number) = field.as_f64().or_else(|| field["raw"].as_f64()) {
                flat.insert(key.clone(), Value::from(number));
            }
        }
    }

    let mut raw: RawFundamentals = serde_json::from_value(Value::Object(flat))?;
    raw.dividend_yield = raw.dividend_yield.map(|y| y * 100.0);
    Ok(if raw.is_empty() { None } else { Some(raw) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn client(base_url: &str) -> YahooClient {
        let limiter = Arc::new(SharedRateLimiter::new(60));
        YahooClient::with_options(base_url, false, limiter, "^N225", "Nikkei 225").unwrap()
    }

    #[test]
    fn test_endpoint_chart_url() {
        let url = client("https://query1.finance.yahoo.com")
            .endpoint(&["v8", "finance", "chart", "7203.T"], &[("range", "1y"), ("interval", "1d")])
            .unwrap();
        assert_eq!(url, "https://query1.finance.yahoo.com/v8/finance/chart/7203.T?range=1y&interval=1d");
    }

    #[test]
    fn test_endpoint_escapes_segments_and_query() {
        let url = client("https://example.invalid/")
            .endpoint(&["v10", "finance", "quoteSummary", "a/b"], &[("crumb", "x/y+z")])
            .unwrap();
        assert_eq!(url, "https://example.invalid/v10/finance/quoteSummary/a%2Fb?crumb=x%2Fy%2Bz");
    }

    #[test]
    fn test_endpoint_without_query() {
        let url = client("https://example.invalid").endpoint(&["v1", "test", "getcrumb"], &[]).unwrap();
        assert_eq!(url, "https://example.invalid/v1/test/getcrumb");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let limiter = Arc::new(SharedRateLimiter::new(60));
        let result = YahooClient::with_options("not a url", false, limiter, "^N225", "Nikkei 225");
        assert!(matches!(result, Err(ProviderError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_chart_uses_adjusted_close_and_local_dates() {
        // 2024-07-01 00:00 UTC and 2024-07-02 00:00 UTC, exchange at +9h
        let data = json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 32400 },
                    "timestamp": [1719792000, 1719878400],
                    "indicators": {
                        "quote": [{ "close": [100.0, 101.0] }],
                        "adjclose": [{ "adjclose": [99.0, null] }]
                    }
                }],
                "error": null
            }
        });

        let obs = parse_chart(&data).unwrap();
        assert_eq!(obs, vec![(d(2024, 7, 1), Some(99.0)), (d(2024, 7, 2), None)]);
    }

    #[test]
    fn test_parse_chart_falls_back_to_close() {
        let data = json!({
            "chart": {
                "result": [{
                    "meta": {},
                    "timestamp": [1719792000],
                    "indicators": { "quote": [{ "close": [2500.5] }] }
                }]
            }
        });
        assert_eq!(parse_chart(&data).unwrap(), vec![(d(2024, 7, 1), Some(2500.5))]);
    }

    #[test]
    fn test_parse_chart_error_is_no_data() {
        let data = json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" } }
        });
        assert!(matches!(parse_chart(&data), Err(ProviderError::NoData)));
    }

    #[test]
    fn test_parse_chart_mismatched_lengths() {
        let data = json!({
            "chart": { "result": [{
                "timestamp": [1719792000, 1719878400],
                "indicators": { "quote": [{ "close": [1.0] }] }
            }] }
        });
        assert!(matches!(parse_chart(&data), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_quote_summary_flattens_modules() {
        let data = json!({
            "quoteSummary": {
                "result": [{
                    "financialData": {
                        "returnOnEquity": { "raw": 0.153, "fmt": "15.30%" },
                        "profitMargins": { "raw": 0.1, "fmt": "10.00%" },
                        "debtToEquity": { "raw": 105.3, "fmt": "105.30" },
                        "currentRatio": { "raw": 1.2, "fmt": "1.20" },
                        "financialCurrency": "JPY"
                    },
                    "defaultKeyStatistics": {
                        "forwardPE": { "raw": 9.8, "fmt": "9.80" },
                        "priceToBook": 1.05,
                        "profitMargins": { "raw": 0.5 }
                    },
                    "summaryDetail": {
                        "dividendYield": { "raw": 0.025, "fmt": "2.50%" },
                        "marketCap": { "raw": 45600000000000.0 },
                        "payoutRatio": {}
                    }
                }],
                "error": null
            }
        });

        let raw = parse_quote_summary(&data).unwrap().unwrap();
        assert_eq!(raw.return_on_equity, Some(0.153));
        assert_eq!(raw.profit_margins, Some(0.1));
        assert_eq!(raw.forward_pe, Some(9.8));
        assert_eq!(raw.price_to_book, Some(1.05));
        assert_eq!(raw.dividend_yield, Some(2.5));
        assert_eq!(raw.market_cap, Some(45600000000000.0));
        assert_eq!(raw.payout_ratio, None);
    }

    #[test]
    fn test_parse_quote_summary_empty() {
        assert_eq!(parse_quote_summary(&json!({ "quoteSummary": { "result": [] } })).unwrap(), None);
        assert_eq!(
            parse_quote_summary(&json!({ "quoteSummary": { "result": [{ "price": {} }] } })).unwrap(),
            None
        );
    }

    #[test]
    fn test_quote_summary_dividend_yield_displays_as_percent() {
        let data = json!({
            "quoteSummary": {
                "result": [{
                    "summaryDetail": {
                        "dividendYield": { "raw": 0.025, "fmt": "2.50%" },
                        "payoutRatio": { "raw": 0.35, "fmt": "35.00%" }
                    }
                }]
            }
        });

        let raw = parse_quote_summary(&data).unwrap().unwrap();
        let row = crate::analysis::build_row("8058.T", "8058 三菱商事", &raw);
        let cells = row.formatted_cells();
        assert_eq!(crate::models::FundamentalsRow::headers()[10], "Dividend yield (%)");
        assert_eq!(cells[10], "2.50");
        assert_eq!(cells[11], "35");
    }

    #[tokio::test]
    async fn test_rate_limiter_under_limit_does_not_wait() {
        let limiter = SharedRateLimiter::new(10);
        let started = std::time::Instant::now();
        limiter.enforce_rate_limit().await;
        limiter.enforce_rate_limit().await;
        assert!(started.elapsed() < StdDuration::from_secs(1));
        assert_eq!(limiter.request_timestamps.lock().await.len(), 2);
    }

    #[test]
    fn test_client_creation() {
        let client = client("https://example.invalid/");
        assert_eq!(client.base_url.as_str(), "https://example.invalid/");
        assert_eq!(client.benchmark_symbol(), "^N225");
        assert_eq!(client.benchmark_label(), "Nikkei 225");
        assert_eq!(client.get_user_agent(), USER_AGENTS[0]);
    }
}
