//! Return computation, peer aggregation, axis domains and fundamentals shaping.
//!
//! Everything in this module is a pure function of its inputs; the
//! dashboard recomputes it on every selection change.

pub mod axis_domain;
pub mod fundamentals;
pub mod peers;
pub mod returns;

pub use axis_domain::{resolve_axis_domain, AxisDomain};
pub use fundamentals::{build_fundamentals_table, build_row, FetchedFundamentals};
pub use peers::{all_peer_averages, peer_average};
pub use returns::{compute_returns, series_returns};
