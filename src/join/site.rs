//! Site metadata series
//!
//! A site table has a `timestamp` column, an optional `measurement` column
//! and any number of numeric columns (weather station values, irrigation
//! state, ...). Rows naming a measurement only apply to that measurement;
//! rows without one apply everywhere.

use super::GapReason;
use crate::errors::Result;
use crate::tables::{parse_optional_f64, parse_timestamp, timeseries::Nearest, Table, Timeseries};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::Path;

/// Site values attached to a zone
#[derive(Debug, Clone, PartialEq)]
pub struct SiteReading {
    pub time: DateTime<Utc>,
    /// One value per [`SiteTable::columns`] entry
    pub values: Vec<f64>,
}

/// Site series, shared and per measurement
#[derive(Debug, Clone, Default)]
pub struct SiteTable {
    columns: Vec<String>,
    shared: Option<Timeseries>,
    per_measurement: HashMap<String, Timeseries>,
}

impl SiteTable {
    /// Read a site table
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::HydError::Table`] for a missing `timestamp`
    /// column or timestamps that do not parse.
    pub fn read(path: &Path) -> Result<Self> {
        Self::from_table(&Table::read(path)?)
    }

    pub fn from_table(table: &Table) -> Result<Self> {
        let timestamp = table.require_column("timestamp")?;
        let measurement = table.column("measurement");
        let value_columns: Vec<usize> = (0..table.headers.len())
            .filter(|&c| c != timestamp && Some(c) != measurement)
            .collect();
        let columns: Vec<String> = value_columns
            .iter()
            .map(|&c| table.headers[c].clone())
            .collect();

        let mut shared = Vec::new();
        let mut per_measurement: HashMap<String, Vec<_>> = HashMap::new();
        for (row_no, row) in table.rows.iter().enumerate() {
            let time = parse_timestamp(&row[timestamp])
                .ok_or_else(|| table.cell_error(row_no, timestamp, "a timestamp"))?;
            let values: Vec<f64> = value_columns
                .iter()
                .map(|&c| parse_optional_f64(&row[c]).unwrap_or(f64::NAN))
                .collect();
            match measurement.map(|c| row[c].trim()).filter(|m| !m.is_empty()) {
                Some(name) => per_measurement
                    .entry(name.to_string())
                    .or_default()
                    .push((time, values)),
                None => shared.push((time, values)),
            }
        }

        Ok(Self {
            shared: (!shared.is_empty()).then(|| Timeseries::from_rows(columns.clone(), shared)),
            per_measurement: per_measurement
                .into_iter()
                .map(|(name, rows)| (name, Timeseries::from_rows(columns.clone(), rows)))
                .collect(),
            columns,
        })
    }

    /// Names of the value columns
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Series that applies to a measurement
    #[must_use]
    pub fn series_for(&self, measurement: &str) -> Option<&Timeseries> {
        self.per_measurement
            .get(measurement)
            .or(self.shared.as_ref())
    }
}

/// Site values closest to `time`
///
/// # Errors
///
/// Returns the reason no values could be attached.
pub fn join_site(
    table: &SiteTable,
    measurement: &str,
    time: DateTime<Utc>,
    max_delta: Duration,
) -> std::result::Result<SiteReading, GapReason> {
    let series = table.series_for(measurement).ok_or(GapReason::NoSeries)?;
    match series.nearest(time, max_delta) {
        Nearest::Found { time, values } => Ok(SiteReading {
            time,
            values: values.to_vec(),
        }),
        Nearest::TooFar { delta } => Err(GapReason::TooFar { delta }),
        Nearest::Empty => Err(GapReason::NoSeries),
    }
}
