//! Sector-peer average series

use crate::constants::PEER_AVERAGE_LABEL;
use crate::models::{DatedSeries, ReturnTable};

/// Row-wise mean of every column except `focal`.
///
/// Only present values count towards a row's mean; a row where every peer is
/// missing stays missing. Returns `None` when there is no peer column at all,
/// which callers must treat as "nothing to compare against".
pub fn peer_average(returns: &ReturnTable, focal: &str) -> Option<DatedSeries> {
    let peers: Vec<&[Option<f64>]> = returns
        .columns()
        .iter()
        .filter(|c| c.key != focal)
        .map(|c| c.values.as_slice())
        .collect();

    if peers.is_empty() {
        return None;
    }

    let values = (0..returns.row_count())
        .map(|row| {
            let (sum, count) = peers
                .iter()
                .filter_map(|col| col[row].filter(|v| v.is_finite()))
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            if count == 0 {
                None
            } else {
                Some(sum / count as f64)
            }
        })
        .collect();

    Some(DatedSeries {
        name: PEER_AVERAGE_LABEL.to_string(),
        dates: returns.dates().to_vec(),
        values,
    })
}

/// Peer average for every column, keyed by the focal column.
/// Empty when fewer than two columns are present.
pub fn all_peer_averages(returns: &ReturnTable) -> Vec<(String, DatedSeries)> {
    if returns.column_count() < 2 {
        return Vec::new();
    }

    returns
        .columns()
        .iter()
        .filter_map(|c| peer_average(returns, &c.key).map(|avg| (c.key.clone(), avg)))
        .collect()
}
