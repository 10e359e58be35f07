//! Memoized provider fetches
//!
//! Prices are keyed by (ticker set, period), the benchmark by period and the
//! fundamentals table by ticker set. Entries expire after the configured TTL.
//! A rate-limit error from any fetch clears every map so the next request
//! starts from scratch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{DatedSeries, FundamentalsTable, Period, PriceTable};
use crate::services::provider::{BenchmarkProvider, PriceSeriesProvider, ProviderError};

#[derive(Clone, Debug)]
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

type PriceKey = (Vec<String>, Period);

/// Entry counts per map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub prices: usize,
    pub benchmark: usize,
    pub fundamentals: usize,
}

#[derive(Debug)]
pub struct FetchCache {
    prices: RwLock<HashMap<PriceKey, CacheEntry<PriceTable>>>,
    benchmark: RwLock<HashMap<Period, CacheEntry<DatedSeries>>>,
    fundamentals: RwLock<HashMap<Vec<String>, CacheEntry<FundamentalsTable>>>,
    /// None keeps entries until they are cleared
    ttl: Option<Duration>,
}

impl FetchCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            benchmark: RwLock::new(HashMap::new()),
            fundamentals: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_fresh<T>(&self, entry: &CacheEntry<T>) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => {
                let age = Utc::now() - entry.cached_at;
                age.to_std().map_or(true, |age| age < ttl)
            }
        }
    }

    /// Closing prices for `tickers`, fetched once per ticker set and period.
    /// Columns come back in the order of `tickers`.
    pub async fn prices<P: PriceSeriesProvider>(
        &self,
        provider: &P,
        tickers: &[String],
        period: Period,
    ) -> Result<PriceTable, ProviderError> {
        let key = (set_key(tickers), period);

        {
            let prices = self.prices.read().await;
            if let Some(entry) = prices.get(&key).filter(|e| self.is_fresh(e)) {
                debug!("Price cache hit: {:?} {}", key.0, period);
                return Ok(entry.data.select_columns(tickers));
            }
        }

        debug!("Price cache miss: {:?} {}", key.0, period);
        let table = self.guard(provider.fetch_prices(tickers, period).await).await?;

        self.prices.write().await.insert(
            key,
            CacheEntry { data: table.clone(), cached_at: Utc::now() },
        );
        Ok(table.select_columns(tickers))
    }

    /// Benchmark series, fetched once per period
    pub async fn benchmark<P: BenchmarkProvider>(
        &self,
        provider: &P,
        period: Period,
    ) -> Result<DatedSeries, ProviderError> {
        {
            let benchmark = self.benchmark.read().await;
            if let Some(entry) = benchmark.get(&period).filter(|e| self.is_fresh(e)) {
                debug!("Benchmark cache hit: {}", period);
                return Ok(entry.data.clone());
            }
        }

        debug!("Benchmark cache miss: {}", period);
        let series = self.guard(provider.fetch_benchmark(period).await).await?;

        self.benchmark.write().await.insert(
            period,
            CacheEntry { data: series.clone(), cached_at: Utc::now() },
        );
        Ok(series)
    }

    /// Fundamentals table for a ticker set; `build` runs only on a miss.
    /// Rows come back in the order of `tickers`.
    pub async fn fundamentals<F, Fut>(
        &self,
        tickers: &[String],
        build: F,
    ) -> Result<FundamentalsTable, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FundamentalsTable, ProviderError>>,
    {
        let key = set_key(tickers);

        {
            let fundamentals = self.fundamentals.read().await;
            if let Some(entry) = fundamentals.get(&key).filter(|e| self.is_fresh(e)) {
                debug!("Fundamentals cache hit: {:?}", key);
                return Ok(in_ticker_order(entry.data.clone(), tickers));
            }
        }

        debug!("Fundamentals cache miss: {:?}", key);
        let table = self.guard(build().await).await?;

        self.fundamentals.write().await.insert(
            key,
            CacheEntry { data: table.clone(), cached_at: Utc::now() },
        );
        Ok(in_ticker_order(table, tickers))
    }

    /// Clear every map when the provider signals a rate limit
    async fn guard<T>(&self, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
        if result.as_ref().is_err_and(ProviderError::is_rate_limit) {
            warn!("Provider rate limit hit, clearing fetch cache");
            self.clear().await;
        }
        result
    }

    pub async fn clear(&self) {
        self.prices.write().await.clear();
        self.benchmark.write().await.clear();
        self.fundamentals.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            prices: self.prices.read().await.len(),
            benchmark: self.benchmark.read().await.len(),
            fundamentals: self.fundamentals.read().await.len(),
        }
    }
}

fn set_key(tickers: &[String]) -> Vec<String> {
    let mut key = tickers.to_vec();
    key.sort();
    key.dedup();
    key
}

fn in_ticker_order(mut table: FundamentalsTable, tickers: &[String]) -> FundamentalsTable {
    table
        .rows
        .sort_by_key(|row| tickers.iter().position(|t| *t == row.symbol).unwrap_or(usize::MAX));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FundamentalsRow;
    use crate::services::mock::MockProvider;

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn provider() -> MockProvider {
        MockProvider::new()
            .with_prices("A", Period::Year1, &[Some(100.0), Some(110.0)])
            .with_prices("B", Period::Year1, &[Some(50.0), Some(55.0)])
            .with_benchmark(Period::Year1, &[Some(40000.0), Some(41000.0)])
    }

    #[tokio::test]
    async fn test_price_cache_hit_does_not_refetch() {
        let provider = provider();
        let cache = FetchCache::new(None);

        let first = cache.prices(&provider, &tickers(&["A", "B"]), Period::Year1).await.unwrap();
        let second = cache.prices(&provider, &tickers(&["B", "A"]), Period::Year1).await.unwrap();

        assert_eq!(MockProvider::calls(&provider.price_calls), 1);
        assert_eq!(first.column_keys(), vec!["A", "B"]);
        assert_eq!(second.column_keys(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_distinct_periods_are_distinct_entries() {
        let provider = provider();
        let cache = FetchCache::new(None);

        cache.prices(&provider, &tickers(&["A"]), Period::Year1).await.unwrap();
        cache.prices(&provider, &tickers(&["A"]), Period::Month1).await.unwrap();

        assert_eq!(MockProvider::calls(&provider.price_calls), 2);
        assert_eq!(cache.stats().await.prices, 2);
    }

    #[tokio::test]
    async fn test_benchmark_memoized_per_period() {
        let provider = provider();
        let cache = FetchCache::new(None);

        cache.benchmark(&provider, Period::Year1).await.unwrap();
        cache.benchmark(&provider, Period::Year1).await.unwrap();
        assert_eq!(MockProvider::calls(&provider.benchmark_calls), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let provider = provider();
        let cache = FetchCache::new(Some(Duration::ZERO));

        cache.prices(&provider, &tickers(&["A"]), Period::Year1).await.unwrap();
        cache.prices(&provider, &tickers(&["A"]), Period::Year1).await.unwrap();
        assert_eq!(MockProvider::calls(&provider.price_calls), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_clears_every_map() {
        let provider = provider();
        let cache = FetchCache::new(None);

        cache.prices(&provider, &tickers(&["A"]), Period::Year1).await.unwrap();
        cache.benchmark(&provider, Period::Year1).await.unwrap();
        cache
            .fundamentals(&tickers(&["A"]), || async { Ok(FundamentalsTable::default()) })
            .await
            .unwrap();
        assert_eq!(cache.stats().await, CacheStats { prices: 1, benchmark: 1, fundamentals: 1 });

        provider.set_rate_limited(true);
        let err = cache.prices(&provider, &tickers(&["B"]), Period::Year1).await.unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(cache.stats().await, CacheStats::default());

        // Next request after the limit lifts goes back to the provider
        provider.set_rate_limited(false);
        cache.prices(&provider, &tickers(&["A"]), Period::Year1).await.unwrap();
        assert_eq!(MockProvider::calls(&provider.price_calls), 3);
    }

    #[tokio::test]
    async fn test_fundamentals_build_runs_once_and_keeps_order() {
        let cache = FetchCache::new(None);
        let table = FundamentalsTable {
            rows: vec![
                FundamentalsRow { symbol: "A".to_string(), ..Default::default() },
                FundamentalsRow { symbol: "B".to_string(), ..Default::default() },
            ],
            ..Default::default()
        };

        let built = cache
            .fundamentals(&tickers(&["A", "B"]), || async { Ok(table.clone()) })
            .await
            .unwrap();
        assert_eq!(built.rows[0].symbol, "A");

        let cached = cache
            .fundamentals(&tickers(&["B", "A"]), || async {
                Err(ProviderError::InvalidResponse("should not run".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(cached.rows[0].symbol, "B");
        assert_eq!(cached.rows[1].symbol, "A");
    }
}
