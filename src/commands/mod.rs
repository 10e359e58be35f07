pub mod compare;
pub mod fundamentals;
pub mod sectors;
pub mod serve;

use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::models::{DashboardConfig, SectorCatalog};
use crate::services::{FetchCache, YahooClient};

/// Wire the Yahoo client, catalog and fetch cache from configuration
pub fn build_dashboard(config: &DashboardConfig) -> Result<Dashboard<YahooClient>> {
    let catalog = SectorCatalog::load(config.catalog_file.as_deref())?;
    let client = YahooClient::new(config)?;
    let cache = FetchCache::new(config.cache_ttl());
    Ok(Dashboard::new(client, catalog, cache))
}

/// Tickers from the command line; an empty list means the sector default
pub(crate) fn requested(tickers: &[String]) -> Option<&[String]> {
    if tickers.is_empty() {
        None
    } else {
        Some(tickers)
    }
}
