//! In-memory provider for tests

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::models::{DatedSeries, Period, PriceTable, RawFundamentals, SeriesTable};
use crate::services::provider::{
    BenchmarkProvider, FundamentalsProvider, PriceSeriesProvider, ProviderError,
};

#[derive(Default)]
pub struct MockProvider {
    prices: HashMap<(String, Period), Vec<(NaiveDate, Option<f64>)>>,
    benchmark: HashMap<Period, DatedSeries>,
    fundamentals: HashMap<String, RawFundamentals>,
    failing_periods: HashSet<Period>,
    failing_fundamentals: HashSet<String>,
    rate_limited: AtomicBool,
    pub price_calls: AtomicUsize,
    pub benchmark_calls: AtomicUsize,
    pub fundamentals_calls: AtomicUsize,
}

pub fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Daily closes starting at 2024-05-01
    pub fn with_prices(mut self, ticker: &str, period: Period, closes: &[Option<f64>]) -> Self {
        let obs = closes
            .iter()
            .enumerate()
            .map(|(i, c)| (day(i as u32 + 1), *c))
            .collect();
        self.prices.insert((ticker.to_string(), period), obs);
        self
    }

    pub fn with_benchmark(mut self, period: Period, closes: &[Option<f64>]) -> Self {
        let dates = (1..=closes.len() as u32).map(day).collect();
        let series = DatedSeries::new("Nikkei 225", dates, closes.to_vec()).unwrap();
        self.benchmark.insert(period, series);
        self
    }

    pub fn with_fundamentals(mut self, ticker: &str, raw: RawFundamentals) -> Self {
        self.fundamentals.insert(ticker.to_string(), raw);
        self
    }

    pub fn with_failing_period(mut self, period: Period) -> Self {
        self.failing_periods.insert(period);
        self
    }

    pub fn with_failing_fundamentals(mut self, ticker: &str) -> Self {
        self.failing_fundamentals.insert(ticker.to_string());
        self
    }

    pub fn set_rate_limited(&self, limited: bool) {
        self.rate_limited.store(limited, Ordering::SeqCst);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl PriceSeriesProvider for MockProvider {
    async fn fetch_prices(&self, tickers: &[String], period: Period) -> Result<PriceTable, ProviderError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(ProviderError::RateLimit);
        }
        if self.failing_periods.contains(&period) {
            return Err(ProviderError::InvalidResponse(format!("{} unavailable", period)));
        }

        let series = tickers
            .iter()
            .map(|t| {
                let obs = self.prices.get(&(t.clone(), period)).cloned().unwrap_or_default();
                (t.clone(), obs)
            })
            .collect();

        Ok(SeriesTable::from_observations(series)
            .forward_fill()
            .drop_empty_columns())
    }
}

impl BenchmarkProvider for MockProvider {
    fn benchmark_label(&self) -> &str {
        "Nikkei 225"
    }

    async fn fetch_benchmark(&self, period: Period) -> Result<DatedSeries, ProviderError> {
        self.benchmark_calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(ProviderError::RateLimit);
        }
        self.benchmark.get(&period).cloned().ok_or(ProviderError::NoData)
    }
}

impl FundamentalsProvider for MockProvider {
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Option<RawFundamentals>, ProviderError> {
        self.fundamentals_calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(ProviderError::RateLimit);
        }
        if self.failing_fundamentals.contains(ticker) {
            return Err(ProviderError::InvalidResponse("quote summary error".to_string()));
        }
        Ok(self.fundamentals.get(ticker).cloned())
    }
}
