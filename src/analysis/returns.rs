//! Period-normalized percentage returns

use crate::models::{DatedSeries, PriceTable, ReturnTable};

/// Percentage change of every cell relative to the first row of its column.
///
/// `return[t] = 100 * (price[t] / price[0] - 1)`. A column whose first value
/// is missing, zero or non-finite has no base and comes out entirely missing.
pub fn compute_returns(prices: &PriceTable) -> ReturnTable {
    prices.map_columns(normalize)
}

/// Same as [`compute_returns`] for a single series
pub fn series_returns(series: &DatedSeries) -> DatedSeries {
    DatedSeries {
        name: series.name.clone(),
        dates: series.dates.clone(),
        values: normalize(&series.values),
    }
}

fn normalize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let base = match values.first().copied().flatten() {
        Some(b) if b.is_finite() && b != 0.0 => b,
        _ => return vec![None; values.len()],
    };

    values
        .iter()
        .map(|v| {
            v.map(|price| (price / base - 1.0) * 100.0)
                .filter(|r| r.is_finite())
        })
        .collect()
}
