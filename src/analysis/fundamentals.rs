//! Fundamentals table shaping

use chrono::Utc;

use crate::constants::MARKET_CAP_DIVISOR;
use crate::models::{FundamentalsRow, FundamentalsTable, RawFundamentals, SectorCatalog};

/// Outcome of fetching one ticker's raw fundamentals
pub type FetchedFundamentals<E> = (String, Result<Option<RawFundamentals>, E>);

/// Shape one raw record into a display row.
///
/// Ratios P/E, P/B, P/S, D/E and the current ratio pass through. Fractional
/// metrics are scaled to percent, but only when present and non-zero.
/// Market cap is expressed in trillions. Dividend yield is passed through
/// as reported and is never multiplied by 100.
pub fn build_row(symbol: &str, name: &str, raw: &RawFundamentals) -> FundamentalsRow {
    FundamentalsRow {
        symbol: symbol.to_string(),
        name: name.to_string(),
        per: raw.forward_pe,
        pbr: raw.price_to_book,
        psr: raw.price_to_sales_trailing_12_months,
        roe_pct: percent(raw.return_on_equity),
        operating_margin_pct: percent(raw.operating_margins),
        net_margin_pct: percent(raw.profit_margins),
        revenue_growth_pct: percent(raw.revenue_growth),
        earnings_growth_pct: percent(raw.earnings_growth),
        dividend_yield_pct: truthy(raw.dividend_yield),
        payout_ratio_pct: percent(raw.payout_ratio),
        debt_to_equity: raw.debt_to_equity,
        current_ratio: raw.current_ratio,
        market_cap_trillion: truthy(raw.market_cap).map(|cap| cap / MARKET_CAP_DIVISOR),
    }
}

/// Build the table from per-ticker fetch outcomes.
///
/// Tickers whose fetch failed or returned an empty record are skipped with a
/// warning; the remaining rows keep the input order.
pub fn build_fundamentals_table<E: std::fmt::Display>(
    catalog: &SectorCatalog,
    fetched: Vec<FetchedFundamentals<E>>,
) -> FundamentalsTable {
    let mut rows = Vec::with_capacity(fetched.len());
    let mut skipped = Vec::new();

    for (symbol, outcome) in fetched {
        match outcome {
            Ok(Some(raw)) if !raw.is_empty() => {
                let name = catalog.display_name_or_symbol(&symbol);
                rows.push(build_row(&symbol, &name, &raw));
            }
            Ok(_) => {
                tracing::warn!("Fundamentals for {} are empty (no data)", symbol);
                skipped.push(symbol);
            }
            Err(e) => {
                tracing::warn!("Fundamentals fetch for {} failed: {}", symbol, e);
                skipped.push(symbol);
            }
        }
    }

    FundamentalsTable {
        rows,
        last_updated: Some(Utc::now()),
        skipped,
    }
}

fn truthy(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

fn percent(value: Option<f64>) -> Option<f64> {
    truthy(value).map(|v| v * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value present");
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_roe_scaled_to_percent() {
        let raw = RawFundamentals { return_on_equity: Some(0.153), ..Default::default() };
        let row = build_row("7203.T", "7203 トヨタ自動車", &raw);
        assert_close(row.roe_pct, 15.3);
    }

    #[test]
    fn test_dividend_yield_not_scaled() {
        let raw = RawFundamentals { dividend_yield: Some(2.5), ..Default::default() };
        let row = build_row("8058.T", "8058 三菱商事", &raw);
        assert_eq!(row.dividend_yield_pct, Some(2.5));
    }

    #[test]
    fn test_pass_through_ratios() {
        let raw = RawFundamentals {
            forward_pe: Some(12.5),
            price_to_book: Some(1.1),
            price_to_sales_trailing_12_months: Some(0.7),
            debt_to_equity: Some(105.3),
            current_ratio: Some(1.4),
            ..Default::default()
        };
        let row = build_row("X", "X", &raw);

        assert_eq!(row.per, Some(12.5));
        assert_eq!(row.pbr, Some(1.1));
        assert_eq!(row.psr, Some(0.7));
        assert_eq!(row.debt_to_equity, Some(105.3));
        assert_eq!(row.current_ratio, Some(1.4));
    }

    #[test]
    fn test_zero_or_missing_scaled_fields_stay_missing() {
        let raw = RawFundamentals {
            operating_margins: Some(0.0),
            payout_ratio: None,
            market_cap: Some(0.0),
            dividend_yield: Some(0.0),
            ..Default::default()
        };
        let row = build_row("X", "X", &raw);

        assert_eq!(row.operating_margin_pct, None);
        assert_eq!(row.payout_ratio_pct, None);
        assert_eq!(row.market_cap_trillion, None);
        assert_eq!(row.dividend_yield_pct, None);
    }

    #[test]
    fn test_market_cap_in_trillions() {
        let raw = RawFundamentals { market_cap: Some(45_600_000_000_000.0), ..Default::default() };
        assert_close(build_row("X", "X", &raw).market_cap_trillion, 45.6);
    }

    #[test]
    fn test_negative_growth_kept() {
        let raw = RawFundamentals { earnings_growth: Some(-0.12), ..Default::default() };
        assert_close(build_row("X", "X", &raw).earnings_growth_pct, -12.0);
    }

    #[test]
    fn test_table_skips_failed_and_empty_tickers() {
        let catalog = SectorCatalog::builtin();
        let fetched: Vec<FetchedFundamentals<String>> = vec![
            ("9432.T".to_string(), Ok(Some(RawFundamentals { forward_pe: Some(10.0), ..Default::default() }))),
            ("9433.T".to_string(), Err("HTTP error".to_string())),
            ("9434.T".to_string(), Ok(None)),
            ("9435.T".to_string(), Ok(Some(RawFundamentals::default()))),
        ];

        let table = build_fundamentals_table(&catalog, fetched);

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].name, "9432 NTT");
        assert_eq!(table.skipped, vec!["9433.T", "9434.T", "9435.T"]);
        assert!(table.last_updated.is_some());
    }
}
