use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AppError, Result};

/// One column of a date-indexed table; `None` marks a missing cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(key: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self { key: key.into(), values }
    }

    /// True when at least one cell holds a finite value
    pub fn has_data(&self) -> bool {
        self.values.iter().any(|v| matches!(v, Some(x) if x.is_finite()))
    }
}

/// Date-indexed table with one column per ticker
///
/// Invariants:
/// - `dates` is strictly increasing
/// - every column has exactly `dates.len()` cells
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

/// Closing prices, one column per ticker
pub type PriceTable = SeriesTable;

/// Percentage returns relative to the first row, same shape as the price table
pub type ReturnTable = SeriesTable;

impl SeriesTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self> {
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::InvalidInput(
                "Dates must be strictly increasing".to_string(),
            ));
        }
        if let Some(col) = columns.iter().find(|c| c.values.len() != dates.len()) {
            return Err(AppError::InvalidInput(format!(
                "Column '{}' has {} cells, expected {}",
                col.key,
                col.values.len(),
                dates.len()
            )));
        }
        Ok(Self { dates, columns })
    }

    /// Align per-ticker observations onto the union of their dates.
    ///
    /// Columns keep the input order; dates missing for a ticker become `None`.
    /// Later duplicates of the same date overwrite earlier ones.
    pub fn from_observations(series: Vec<(String, Vec<(NaiveDate, Option<f64>)>)>) -> Self {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, obs)| obs.iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let columns = series
            .into_iter()
            .map(|(key, obs)| {
                let by_date: BTreeMap<NaiveDate, Option<f64>> = obs.into_iter().collect();
                let values = dates
                    .iter()
                    .map(|d| by_date.get(d).copied().flatten())
                    .collect();
                Column { key, values }
            })
            .collect();

        Self { dates, columns }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn column_keys(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.columns.is_empty()
    }

    /// Carry the last observed value forward over missing cells.
    /// Leading gaps stay missing.
    pub fn forward_fill(mut self) -> Self {
        for column in &mut self.columns {
            let mut last: Option<f64> = None;
            for cell in &mut column.values {
                match cell {
                    Some(v) if v.is_finite() => last = Some(*v),
                    _ => *cell = last,
                }
            }
        }
        self
    }

    /// Remove columns that have no data at all
    pub fn drop_empty_columns(mut self) -> Self {
        self.columns.retain(Column::has_data);
        self
    }

    /// Rename every column key
    pub fn rename_columns<F>(mut self, mut rename: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        for column in &mut self.columns {
            column.key = rename(&column.key);
        }
        self
    }

    /// Keep only `keys`, in that order; keys without a column are skipped
    pub fn select_columns(&self, keys: &[String]) -> SeriesTable {
        let columns = keys
            .iter()
            .filter_map(|k| self.column(k).cloned())
            .collect();
        SeriesTable { dates: self.dates.clone(), columns }
    }

    /// New table over the same dates and keys with each column's values transformed.
    /// `transform` must return one value per date.
    pub fn map_columns<F>(&self, mut transform: F) -> SeriesTable
    where
        F: FnMut(&[Option<f64>]) -> Vec<Option<f64>>,
    {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut values = transform(&c.values);
                values.resize(self.dates.len(), None);
                Column { key: c.key.clone(), values }
            })
            .collect();

        SeriesTable { dates: self.dates.clone(), columns }
    }

    /// Extract one column as a standalone series
    pub fn series(&self, key: &str) -> Option<DatedSeries> {
        self.column(key).map(|c| DatedSeries {
            name: c.key.clone(),
            dates: self.dates.clone(),
            values: c.values.clone(),
        })
    }

    /// Min/max over every finite cell
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.columns.iter().flat_map(|c| c.values.iter()))
    }
}

/// A single named series over its own date index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatedSeries {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
}

impl DatedSeries {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(AppError::InvalidInput(format!(
                "Series '{}' has {} dates but {} values",
                name,
                dates.len(),
                values.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::InvalidInput(format!(
                "Series '{}' dates must be strictly increasing",
                name
            )));
        }
        Ok(Self { name, dates, values })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn has_data(&self) -> bool {
        self.values.iter().any(|v| matches!(v, Some(x) if x.is_finite()))
    }

    pub fn forward_fill(mut self) -> Self {
        let mut last: Option<f64> = None;
        for cell in &mut self.values {
            match cell {
                Some(v) if v.is_finite() => last = Some(*v),
                _ => *cell = last,
            }
        }
        self
    }

    /// Project onto another date index; dates this series lacks become `None`
    pub fn reindex(&self, dates: &[NaiveDate]) -> DatedSeries {
        let by_date: BTreeMap<NaiveDate, Option<f64>> = self
            .dates
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect();

        DatedSeries {
            name: self.name.clone(),
            dates: dates.to_vec(),
            values: dates.iter().map(|d| by_date.get(d).copied().flatten()).collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Min/max over finite values
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.values.iter())
    }
}

fn bounds<'a, I>(values: I) -> Option<(f64, f64)>
where
    I: Iterator<Item = &'a Option<f64>>,
{
    values
        .filter_map(|v| v.filter(|x| x.is_finite()))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
