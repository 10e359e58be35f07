//! Dashboard section pipeline
//!
//! Every call recomputes its section from (memoized) provider fetches:
//! prices -> returns -> peer averages -> axis domain. Sections are built
//! independently so one failure never hides the others.

mod outcome;
mod sections;

pub use outcome::{SectionOutcome, RATE_LIMIT_MESSAGE};
pub use sections::{
    ComparisonGrid, DashboardReport, GridCell, GridRow, PeriodDomain, PriceChart, PriceCharts,
    ReturnChart,
};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::{
    all_peer_averages, build_fundamentals_table, compute_returns, resolve_axis_domain,
    series_returns, AxisDomain,
};
use crate::constants::COMPARISON_PERIODS;
use crate::error::{AppError, Result};
use crate::models::{DatedSeries, FundamentalsTable, Period, PriceTable, SectorCatalog, Selection};
use crate::services::{FetchCache, MarketDataProvider, ProviderError};

pub const NO_SELECTION_MESSAGE: &str = "Select tickers to compare";
pub const SINGLE_TICKER_MESSAGE: &str = "Select two or more tickers";
pub const NO_FUNDAMENTALS_MESSAGE: &str = "Could not fetch shareholder metrics";
pub const NO_COMPARISON_MESSAGE: &str = "Comparison data is unavailable for every period";

pub type SharedDashboard<P> = Arc<Dashboard<P>>;

pub struct Dashboard<P> {
    provider: P,
    catalog: SectorCatalog,
    cache: FetchCache,
}

impl<P: MarketDataProvider> Dashboard<P> {
    pub fn new(provider: P, catalog: SectorCatalog, cache: FetchCache) -> Self {
        Self { provider, catalog, cache }
    }

    pub fn catalog(&self) -> &SectorCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn benchmark_label(&self) -> &str {
        self.provider.benchmark_label()
    }

    /// Resolve the selection for a request; see [`Selection::resolve`]
    pub fn select(
        &self,
        sector: &str,
        requested: Option<&[String]>,
        prior: Option<&Selection>,
    ) -> Result<Selection> {
        Selection::resolve(&self.catalog, sector, requested, prior)
    }

    fn name_of(&self, symbol: &str) -> String {
        self.catalog.display_name_or_symbol(symbol)
    }

    /// Display names of selected tickers without any data in `prices`
    fn missing_names(&self, prices: &PriceTable, tickers: &[String]) -> Vec<String> {
        tickers
            .iter()
            .filter(|t| prices.column(t).map_or(true, |c| !c.has_data()))
            .map(|t| self.name_of(t))
            .collect()
    }

    async fn fetch_section_data(
        &self,
        tickers: &[String],
        period: Period,
    ) -> Result<(PriceTable, DatedSeries)> {
        let prices = self.cache.prices(&self.provider, tickers, period).await?;

        let missing = self.missing_names(&prices, tickers);
        if !missing.is_empty() {
            warn!("No {} data for: {}", period, missing.join(", "));
            return Err(AppError::PartialData(missing));
        }

        let benchmark = self.cache.benchmark(&self.provider, period).await?;
        Ok((prices, benchmark))
    }

    async fn build_return_chart(&self, selection: &Selection, period: Period) -> Result<ReturnChart> {
        let (prices, benchmark) = self.fetch_section_data(&selection.tickers, period).await?;

        let returns = compute_returns(&prices).rename_columns(|k| self.name_of(k));
        let benchmark_returns = series_returns(&benchmark);
        let domain = AxisDomain::spanning(&returns, Some(&benchmark_returns));

        Ok(ReturnChart {
            period,
            benchmark: benchmark_returns.reindex(returns.dates()),
            returns,
            domain,
        })
    }

    async fn build_price_charts(&self, selection: &Selection, period: Period) -> Result<PriceCharts> {
        let (prices, benchmark) = self.fetch_section_data(&selection.tickers, period).await?;

        let mut charts = Vec::with_capacity(selection.tickers.len() + 1);
        charts.push(price_chart(
            self.provider.benchmark_label().to_string(),
            benchmark.reindex(prices.dates()),
        ));

        for ticker in &selection.tickers {
            if let Some(series) = prices.series(ticker) {
                let mut chart = price_chart(self.name_of(ticker), series);
                chart.symbol = ticker.clone();
                charts.push(chart);
            }
        }

        Ok(PriceCharts { period, charts })
    }

    /// Comparison grid over the fixed periods.
    ///
    /// A period whose fetch fails is logged and left out; the remaining
    /// periods still render. A rate limit stops the grid: the cache is
    /// already cleared and no further periods are requested.
    async fn build_comparison_grid(&self, selection: &Selection) -> Result<ComparisonGrid> {
        let tickers = &selection.tickers;
        let mut grid = ComparisonGrid::default();
        let mut period_cells: Vec<Vec<GridCell>> = vec![Vec::new(); tickers.len()];

        for period in COMPARISON_PERIODS {
            let fetched = async {
                let prices = self.cache.prices(&self.provider, tickers, period).await?;
                let benchmark = self.cache.benchmark(&self.provider, period).await?;
                Ok::<_, ProviderError>((prices, benchmark))
            }
            .await;

            let (prices, benchmark) = match fetched {
                Ok(data) => data,
                Err(ProviderError::RateLimit) => {
                    warn!("Rate limited while fetching comparison period {}, stopping", period);
                    return Err(AppError::RateLimit);
                }
                Err(e) => {
                    warn!("Skipping comparison period {}: {}", period, e);
                    grid.skipped_periods.push(period);
                    continue;
                }
            };

            let returns = compute_returns(&prices);
            let peers = all_peer_averages(&returns);
            let peer_series: Vec<DatedSeries> = peers.iter().map(|(_, s)| s.clone()).collect();
            let benchmark_returns = series_returns(&benchmark);
            let domain = resolve_axis_domain(&returns, &peer_series, Some(&benchmark_returns));
            debug!("Comparison domain {}: [{:.2}, {:.2}]", period, domain.min, domain.max);

            grid.domains.push(PeriodDomain { period, domain });

            for (ticker, cells) in tickers.iter().zip(period_cells.iter_mut()) {
                let cell = match returns.series(ticker).filter(DatedSeries::has_data) {
                    Some(subject) => {
                        let peer_average = peers
                            .iter()
                            .find(|(key, _)| key == ticker)
                            .map(|(_, s)| s.clone());
                        GridCell::Chart {
                            period,
                            benchmark: Some(benchmark_returns.reindex(&subject.dates)),
                            subject: subject.with_name(self.name_of(ticker)),
                            peer_average,
                            domain,
                        }
                    }
                    None => GridCell::NoData { period },
                };
                cells.push(cell);
            }
        }

        grid.rows = tickers
            .iter()
            .zip(period_cells)
            .map(|(ticker, cells)| GridRow {
                symbol: ticker.clone(),
                name: self.name_of(ticker),
                cells,
            })
            .collect();
        Ok(grid)
    }

    async fn build_fundamentals(&self, selection: &Selection) -> Result<FundamentalsTable> {
        let tickers = &selection.tickers;
        let table = self
            .cache
            .fundamentals(tickers, || async {
                let mut fetched = Vec::with_capacity(tickers.len());
                for ticker in tickers {
                    let outcome = self.provider.fetch_fundamentals(ticker).await;
                    if let Err(ProviderError::RateLimit) = outcome {
                        return Err(ProviderError::RateLimit);
                    }
                    fetched.push((ticker.clone(), outcome));
                }
                Ok(build_fundamentals_table(&self.catalog, fetched))
            })
            .await?;
        Ok(table)
    }

    pub async fn return_chart(&self, selection: &Selection, period: Period) -> SectionOutcome<ReturnChart> {
        if selection.is_empty() {
            return SectionOutcome::Warning(NO_SELECTION_MESSAGE.to_string());
        }
        SectionOutcome::from_result(self.build_return_chart(selection, period).await)
    }

    pub async fn price_charts(&self, selection: &Selection, period: Period) -> SectionOutcome<PriceCharts> {
        if selection.is_empty() {
            return SectionOutcome::Warning(NO_SELECTION_MESSAGE.to_string());
        }
        SectionOutcome::from_result(self.build_price_charts(selection, period).await)
    }

    pub async fn comparison_grid(&self, selection: &Selection) -> SectionOutcome<ComparisonGrid> {
        if selection.is_empty() {
            return SectionOutcome::Warning(NO_SELECTION_MESSAGE.to_string());
        }
        if !selection.supports_peer_comparison() {
            return SectionOutcome::Warning(SINGLE_TICKER_MESSAGE.to_string());
        }

        match self.build_comparison_grid(selection).await {
            Ok(grid) if grid.domains.is_empty() => {
                SectionOutcome::Warning(NO_COMPARISON_MESSAGE.to_string())
            }
            result => SectionOutcome::from_result(result),
        }
    }

    pub async fn fundamentals_table(&self, selection: &Selection) -> SectionOutcome<FundamentalsTable> {
        if selection.is_empty() {
            return SectionOutcome::Warning(NO_SELECTION_MESSAGE.to_string());
        }
        match self.build_fundamentals(selection).await {
            Ok(table) if table.is_empty() => SectionOutcome::Warning(NO_FUNDAMENTALS_MESSAGE.to_string()),
            result => SectionOutcome::from_result(result),
        }
    }

    /// Build all four sections for one selection
    pub async fn report(
        &self,
        selection: Selection,
        return_period: Period,
        price_period: Period,
    ) -> DashboardReport {
        info!(
            "Building dashboard for {} ({} tickers)",
            selection.sector,
            selection.tickers.len()
        );

        let comparison = self.comparison_grid(&selection).await;
        let return_chart = self.return_chart(&selection, return_period).await;
        let price_charts = self.price_charts(&selection, price_period).await;
        let fundamentals = self.fundamentals_table(&selection).await;

        DashboardReport {
            selection,
            return_chart,
            price_charts,
            comparison,
            fundamentals,
        }
    }
}

fn price_chart(label: String, series: DatedSeries) -> PriceChart {
    let domain = series
        .value_bounds()
        .map(|(min, max)| AxisDomain::new(min, max))
        .unwrap_or_default();
    PriceChart {
        symbol: series.name.clone(),
        series: series.with_name(label.clone()),
        label,
        domain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawFundamentals;
    use crate::services::mock::MockProvider;
    use crate::services::CacheStats;

    const SECTOR: &str = "エネルギー";
    const INPEX: &str = "1605.T";
    const ENEOS: &str = "5020.T";
    const IDEMITSU: &str = "5019.T";

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn selection(list: &[&str]) -> Selection {
        Selection { sector: SECTOR.to_string(), tickers: tickers(list) }
    }

    fn all_periods(mut provider: MockProvider, ticker: &str, closes: &[Option<f64>]) -> MockProvider {
        for period in Period::all() {
            provider = provider.with_prices(ticker, period, closes);
        }
        provider
    }

    fn provider() -> MockProvider {
        let mut provider = MockProvider::new();
        provider = all_periods(provider, INPEX, &[Some(100.0), Some(110.0), Some(120.0)]);
        provider = all_periods(provider, ENEOS, &[Some(50.0), Some(45.0), Some(40.0)]);
        provider = all_periods(provider, IDEMITSU, &[Some(10.0), Some(10.0), Some(11.0)]);
        for period in Period::all() {
            provider = provider.with_benchmark(period, &[Some(40000.0), Some(40400.0), Some(39600.0)]);
        }
        provider
    }

    fn dashboard(provider: MockProvider) -> Dashboard<MockProvider> {
        Dashboard::new(provider, SectorCatalog::builtin(), FetchCache::new(None))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[tokio::test]
    async fn test_return_chart_uses_display_names() {
        let dashboard = dashboard(provider());
        let outcome = dashboard.return_chart(&selection(&[INPEX, ENEOS]), Period::Year5).await;
        let chart = outcome.ready().unwrap();

        assert_eq!(chart.returns.column_keys(), vec!["1605 INPEX", "5020 ENEOS"]);
        assert_eq!(chart.benchmark.values[0], Some(0.0));
        // INPEX +20%, ENEOS -20%, benchmark within
        assert_close(chart.domain.min, -20.0);
        assert_close(chart.domain.max, 20.0);
    }

    #[tokio::test]
    async fn test_partial_data_lists_missing_names() {
        let provider = all_periods(MockProvider::new(), INPEX, &[Some(1.0), Some(2.0)])
            .with_benchmark(Period::Year1, &[Some(1.0), Some(1.0)]);
        let dashboard = dashboard(provider);

        let outcome = dashboard.return_chart(&selection(&[INPEX, ENEOS]), Period::Year1).await;
        match outcome {
            SectionOutcome::Failed(message) => assert_eq!(message, "No data for: 5020 ENEOS"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_selection_prompts() {
        let dashboard = dashboard(provider());
        let report = dashboard.report(selection(&[]), Period::Year5, Period::Year5).await;

        for message in [
            report.return_chart.message(),
            report.price_charts.message(),
            report.comparison.message(),
            report.fundamentals.message(),
        ] {
            assert_eq!(message, Some(NO_SELECTION_MESSAGE));
        }
        assert_eq!(MockProvider::calls(&dashboard.provider.price_calls), 0);
    }

    #[tokio::test]
    async fn test_single_ticker_skips_grid_but_keeps_price_chart() {
        let dashboard = dashboard(provider());
        let single = selection(&[INPEX]);

        let grid = dashboard.comparison_grid(&single).await;
        assert_eq!(grid.message(), Some(SINGLE_TICKER_MESSAGE));

        let prices = dashboard.price_charts(&single, Period::Year1).await;
        let charts = prices.ready().unwrap();
        assert_eq!(charts.charts.len(), 2);
    }

    #[tokio::test]
    async fn test_price_charts_put_benchmark_first() {
        let dashboard = dashboard(provider());
        let outcome = dashboard.price_charts(&selection(&[ENEOS, INPEX]), Period::Month1).await;
        let charts = &outcome.ready().unwrap().charts;

        assert_eq!(charts[0].label, "Nikkei 225");
        assert_eq!(charts[1].symbol, ENEOS);
        assert_eq!(charts[1].label, "5020 ENEOS");
        assert_eq!(charts[2].symbol, INPEX);
        assert_eq!(charts[1].domain, AxisDomain::new(40.0, 50.0));
        assert_eq!(charts[0].series.dates.len(), charts[1].series.dates.len());
    }

    #[tokio::test]
    async fn test_comparison_grid_shares_domain_per_period() {
        let dashboard = dashboard(provider());
        let outcome = dashboard.comparison_grid(&selection(&[INPEX, ENEOS, IDEMITSU])).await;
        let grid = outcome.ready().unwrap();

        assert_eq!(grid.periods(), COMPARISON_PERIODS.to_vec());
        assert!(grid.skipped_periods.is_empty());

        // raw [-20, 20] -> padding 2
        let domain = grid.domain(Period::Year1).unwrap();
        assert_close(domain.min, -22.0);
        assert_close(domain.max, 22.0);

        let row = grid.row(ENEOS).unwrap();
        assert_eq!(row.cells.len(), 4);
        for cell in &row.cells {
            match cell {
                GridCell::Chart { subject, peer_average, benchmark, domain: cell_domain, period } => {
                    assert_eq!(subject.name, "5020 ENEOS");
                    assert_eq!(Some(*cell_domain), grid.domain(*period));
                    // INPEX +20 and Idemitsu +10 at the last row
                    let peers = peer_average.as_ref().unwrap();
                    assert_close(peers.values[2].unwrap(), 15.0);
                    assert_eq!(benchmark.as_ref().unwrap().dates, subject.dates);
                }
                GridCell::NoData { .. } => panic!("expected chart cell"),
            }
        }
    }

    #[tokio::test]
    async fn test_comparison_grid_skips_failing_period() {
        let dashboard = dashboard(provider().with_failing_period(Period::Year3));
        let outcome = dashboard.comparison_grid(&selection(&[INPEX, ENEOS])).await;
        let grid = outcome.ready().unwrap();

        assert_eq!(grid.periods(), vec![Period::Month1, Period::Year1, Period::Year5]);
        assert_eq!(grid.skipped_periods, vec![Period::Year3]);
        assert_eq!(grid.row(INPEX).unwrap().cells.len(), 3);
    }

    #[tokio::test]
    async fn test_comparison_grid_marks_missing_ticker_as_no_data() {
        let provider = provider().with_prices(IDEMITSU, Period::Month1, &[None, None, None]);
        let dashboard = dashboard(provider);
        let outcome = dashboard.comparison_grid(&selection(&[INPEX, IDEMITSU])).await;
        let grid = outcome.ready().unwrap();

        let row = grid.row(IDEMITSU).unwrap();
        assert!(matches!(row.cells[0], GridCell::NoData { period: Period::Month1 }));
        assert!(matches!(row.cells[1], GridCell::Chart { .. }));

        // INPEX alone for 1mo: no peers to average
        match &grid.row(INPEX).unwrap().cells[0] {
            GridCell::Chart { peer_average, .. } => assert!(peer_average.is_none()),
            GridCell::NoData { .. } => panic!("expected chart cell"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_and_clears_cache() {
        let dashboard = dashboard(provider());
        let sel = selection(&[INPEX, ENEOS]);

        assert!(dashboard.return_chart(&sel, Period::Year1).await.is_ready());
        assert!(dashboard.cache().stats().await.prices > 0);

        dashboard.provider.set_rate_limited(true);
        let outcome = dashboard.return_chart(&sel, Period::Year5).await;
        assert!(matches!(outcome, SectionOutcome::RateLimited(_)));
        assert_eq!(outcome.message(), Some(RATE_LIMIT_MESSAGE));
        assert_eq!(dashboard.cache().stats().await.prices, 0);
    }

    #[tokio::test]
    async fn test_comparison_grid_stops_on_rate_limit() {
        let dashboard = dashboard(provider());
        let sel = selection(&[INPEX, ENEOS]);

        assert!(dashboard.return_chart(&sel, Period::Year5).await.is_ready());
        let calls_before = MockProvider::calls(&dashboard.provider.price_calls);

        dashboard.provider.set_rate_limited(true);
        let outcome = dashboard.comparison_grid(&sel).await;

        assert!(matches!(outcome, SectionOutcome::RateLimited(_)));
        assert_eq!(outcome.message(), Some(RATE_LIMIT_MESSAGE));
        assert_eq!(MockProvider::calls(&dashboard.provider.price_calls), calls_before + 1);
        assert_eq!(dashboard.cache().stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_fundamentals_skip_failed_ticker_and_memoize() {
        let provider = provider()
            .with_fundamentals(INPEX, RawFundamentals { return_on_equity: Some(0.1), ..Default::default() })
            .with_failing_fundamentals(ENEOS);
        let dashboard = dashboard(provider);
        let sel = selection(&[INPEX, ENEOS]);

        let outcome = dashboard.fundamentals_table(&sel).await;
        let table = outcome.ready().unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].name, "1605 INPEX");
        assert_eq!(table.skipped, vec![ENEOS]);

        dashboard.fundamentals_table(&sel).await;
        assert_eq!(MockProvider::calls(&dashboard.provider.fundamentals_calls), 2);
    }

    #[tokio::test]
    async fn test_fundamentals_empty_table_warns() {
        let dashboard = dashboard(provider());
        let outcome = dashboard.fundamentals_table(&selection(&[INPEX])).await;
        assert_eq!(outcome.message(), Some(NO_FUNDAMENTALS_MESSAGE));
    }

    #[tokio::test]
    async fn test_sections_fail_independently() {
        let provider = all_periods(MockProvider::new(), INPEX, &[Some(1.0), Some(2.0)])
            .with_benchmark(Period::Year5, &[Some(1.0), Some(1.0)])
            .with_fundamentals(ENEOS, RawFundamentals { forward_pe: Some(8.0), ..Default::default() });
        let dashboard = dashboard(provider);

        let report = dashboard
            .report(selection(&[INPEX, ENEOS]), Period::Year5, Period::Year5)
            .await;

        assert!(matches!(report.return_chart, SectionOutcome::Failed(_)));
        assert!(matches!(report.price_charts, SectionOutcome::Failed(_)));
        assert!(report.fundamentals.is_ready());
    }
}
