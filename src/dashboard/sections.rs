use serde::Serialize;

use crate::analysis::AxisDomain;
use crate::dashboard::SectionOutcome;
use crate::models::{DatedSeries, FundamentalsTable, Period, ReturnTable, Selection};

/// Return-over-time chart of every selected ticker
#[derive(Debug, Clone, Serialize)]
pub struct ReturnChart {
    pub period: Period,
    /// Columns keyed by display name
    pub returns: ReturnTable,
    /// Benchmark returns projected onto the table's dates
    pub benchmark: DatedSeries,
    /// Unpadded min/max over the returns and the benchmark
    pub domain: AxisDomain,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceChart {
    pub symbol: String,
    pub label: String,
    pub series: DatedSeries,
    /// Own min/max; price charts do not share a scale
    pub domain: AxisDomain,
}

/// One price chart per ticker, benchmark first
#[derive(Debug, Clone, Serialize)]
pub struct PriceCharts {
    pub period: Period,
    pub charts: Vec<PriceChart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridCell {
    Chart {
        period: Period,
        subject: DatedSeries,
        peer_average: Option<DatedSeries>,
        benchmark: Option<DatedSeries>,
        domain: AxisDomain,
    },
    NoData {
        period: Period,
    },
}

impl GridCell {
    pub fn period(&self) -> Period {
        match self {
            GridCell::Chart { period, .. } | GridCell::NoData { period } => *period,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridRow {
    pub symbol: String,
    pub name: String,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodDomain {
    pub period: Period,
    pub domain: AxisDomain,
}

/// Per-ticker charts across the fixed comparison periods
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonGrid {
    pub domains: Vec<PeriodDomain>,
    /// Periods whose fetch failed and were left out
    pub skipped_periods: Vec<Period>,
    pub rows: Vec<GridRow>,
}

impl ComparisonGrid {
    pub fn periods(&self) -> Vec<Period> {
        self.domains.iter().map(|d| d.period).collect()
    }

    pub fn domain(&self, period: Period) -> Option<AxisDomain> {
        self.domains.iter().find(|d| d.period == period).map(|d| d.domain)
    }

    pub fn row(&self, symbol: &str) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.symbol == symbol)
    }
}

/// All four sections for one selection
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub selection: Selection,
    pub return_chart: SectionOutcome<ReturnChart>,
    pub price_charts: SectionOutcome<PriceCharts>,
    pub comparison: SectionOutcome<ComparisonGrid>,
    pub fundamentals: SectionOutcome<FundamentalsTable>,
}
