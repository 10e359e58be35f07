mod dashboard_config;
mod fundamentals;
mod period;
mod price_table;
mod sector_catalog;
mod selection;

pub use dashboard_config::DashboardConfig;
pub use fundamentals::{FundamentalsRow, FundamentalsTable, RawFundamentals};
pub use period::Period;
pub use price_table::{Column, DatedSeries, PriceTable, ReturnTable, SeriesTable};
pub use sector_catalog::{Sector, SectorCatalog, TickerEntry};
pub use selection::Selection;
