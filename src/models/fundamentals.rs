use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MISSING_VALUE_PLACEHOLDER;
use crate::utils::format_with_separators;

/// Raw per-ticker metrics as reported by the provider
///
/// Field names follow the provider's keys. Ratios such as `return_on_equity`
/// are fractions (0.153 = 15.3%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFundamentals {
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales_trailing_12_months: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub operating_margins: Option<f64>,
    pub profit_margins: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    /// Already a percentage (2.5 = 2.5%), unlike the other ratios
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub market_cap: Option<f64>,
}

impl RawFundamentals {
    /// True when the provider returned no field at all
    pub fn is_empty(&self) -> bool {
        *self == RawFundamentals::default()
    }
}

/// Display-ready fundamentals for one ticker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsRow {
    pub symbol: String,
    pub name: String,
    /// Forward P/E
    pub per: Option<f64>,
    /// Price to book
    pub pbr: Option<f64>,
    /// Price to sales (trailing 12 months)
    pub psr: Option<f64>,
    pub roe_pct: Option<f64>,
    pub operating_margin_pct: Option<f64>,
    pub net_margin_pct: Option<f64>,
    pub revenue_growth_pct: Option<f64>,
    pub earnings_growth_pct: Option<f64>,
    /// Passed through from the provider unscaled
    pub dividend_yield_pct: Option<f64>,
    pub payout_ratio_pct: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub market_cap_trillion: Option<f64>,
}

impl FundamentalsRow {
    /// Column headers matching `formatted_cells`
    pub fn headers() -> [&'static str; 15] {
        [
            "Symbol",
            "Name",
            "PER (fwd)",
            "PBR",
            "PSR",
            "ROE (%)",
            "Operating margin (%)",
            "Net margin (%)",
            "Revenue growth (%)",
            "Earnings growth (%)",
            "Dividend yield (%)",
            "Payout ratio (%)",
            "D/E",
            "Current ratio",
            "Market cap (tn)",
        ]
    }

    /// Cells formatted for display; absent values render as "-"
    pub fn formatted_cells(&self) -> [String; 15] {
        let fixed = |v: Option<f64>, decimals: usize| match v {
            Some(x) => format!("{:.*}", decimals, x),
            None => MISSING_VALUE_PLACEHOLDER.to_string(),
        };
        let grouped = |v: Option<f64>, decimals: usize| match v {
            Some(x) => format_with_separators(x, decimals),
            None => MISSING_VALUE_PLACEHOLDER.to_string(),
        };

        [
            self.symbol.clone(),
            self.name.clone(),
            fixed(self.per, 1),
            fixed(self.pbr, 2),
            fixed(self.psr, 2),
            fixed(self.roe_pct, 1),
            fixed(self.operating_margin_pct, 1),
            fixed(self.net_margin_pct, 1),
            fixed(self.revenue_growth_pct, 1),
            fixed(self.earnings_growth_pct, 1),
            fixed(self.dividend_yield_pct, 2),
            grouped(self.payout_ratio_pct, 0),
            fixed(self.debt_to_equity, 2),
            fixed(self.current_ratio, 1),
            grouped(self.market_cap_trillion, 2),
        ]
    }
}

/// Fundamentals rows plus the time they were fetched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsTable {
    pub rows: Vec<FundamentalsRow>,
    /// When the provider was last queried for this table
    pub last_updated: Option<DateTime<Utc>>,
    /// Tickers skipped because the provider had nothing for them
    pub skipped: Vec<String>,
}

impl FundamentalsTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Caption text for the last update time
    pub fn last_updated_label(&self) -> String {
        match self.last_updated {
            Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
            None => "not fetched".to_string(),
        }
    }

    /// Render as CSV with formatted cells
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(FundamentalsRow::headers())?;
        for row in &self.rows {
            writer.write_record(row.formatted_cells())?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
