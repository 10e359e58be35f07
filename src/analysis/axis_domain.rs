//! Shared y-axis domains
//!
//! Every chart cell of a comparison period uses the same domain so that a
//! ticker's line can be compared visually against the others. The domain
//! covers the subject returns, every peer average of the period and the
//! benchmark, padded by 5% of the range and always containing zero.

use serde::{Deserialize, Serialize};

use crate::constants::{AXIS_PADDING_RATIO, DEFAULT_AXIS_DOMAIN};
use crate::models::{DatedSeries, ReturnTable};

/// Value-axis range, serialized as `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

impl From<[f64; 2]> for AxisDomain {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<AxisDomain> for [f64; 2] {
    fn from(domain: AxisDomain) -> Self {
        [domain.min, domain.max]
    }
}

impl Default for AxisDomain {
    fn default() -> Self {
        let (min, max) = DEFAULT_AXIS_DOMAIN;
        Self { min, max }
    }
}

impl AxisDomain {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Unpadded bounds over the returns table and the benchmark.
    ///
    /// Used by the single return-over-time chart, where every line is drawn
    /// in one chart and no cross-chart comparability is needed.
    pub fn spanning(returns: &ReturnTable, benchmark: Option<&DatedSeries>) -> AxisDomain {
        let raw = merge(returns.value_bounds(), benchmark.and_then(DatedSeries::value_bounds));
        match raw {
            Some((min, max)) => AxisDomain { min, max },
            None => AxisDomain::default(),
        }
    }
}

/// Resolve the shared domain of one comparison period.
///
/// 1. raw min/max over the subject returns, the peer averages and the
///    benchmark, ignoring missing values
/// 2. without peer averages the subject bounds stand in for them
/// 3. both ends move out by 5% of the raw range
/// 4. the domain is stretched to include zero
/// 5. with no finite value at all the default [-10, 10] is returned
pub fn resolve_axis_domain(
    subject: &ReturnTable,
    peer_averages: &[DatedSeries],
    benchmark: Option<&DatedSeries>,
) -> AxisDomain {
    let subject_bounds = subject.value_bounds();

    let peer_bounds = peer_averages
        .iter()
        .map(DatedSeries::value_bounds)
        .fold(None, merge)
        .or(subject_bounds);

    let benchmark_bounds = benchmark.and_then(DatedSeries::value_bounds);

    let raw = merge(merge(subject_bounds, peer_bounds), benchmark_bounds);
    let Some((raw_min, raw_max)) = raw else {
        return AxisDomain::default();
    };

    let padding = (raw_max - raw_min) * AXIS_PADDING_RATIO;
    let mut min = raw_min - padding;
    let mut max = raw_max + padding;

    if min > 0.0 {
        min = 0.0;
    }
    if max < 0.0 {
        max = 0.0;
    }

    AxisDomain { min, max }
}

fn merge(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => Some((a_lo.min(b_lo), a_hi.max(b_hi))),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}
