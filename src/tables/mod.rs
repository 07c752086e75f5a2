//! Auxiliary table readers
//!
//! The experiment describes masks, zone positions and ignore lists in small
//! tables keyed by measurement name. Tables are either comma separated or,
//! like the experiment's configuration files, separated by runs of whitespace.
//! Both are read through the `csv` crate after a delimiter sniff.
//!
//! # Organization
//!
//! - [`masks`]: crop rectangles and wooden bars
//! - [`positions`]: zone rectangles per camera
//! - [`ignore`]: ignored measurements, datapoints and zones
//! - [`timeseries`]: timestamped series and timestamp parsing

pub mod ignore;
pub mod masks;
pub mod positions;
pub mod timeseries;

pub use timeseries::{parse_timestamp, Timeseries};

use crate::errors::{HydError, Result};
use std::path::{Path, PathBuf};

/// A header row plus string cells, read from a delimited text file
#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a table, detecting comma or whitespace separation
    ///
    /// # Errors
    ///
    /// Returns [`HydError::Io`] if the file cannot be read and
    /// [`HydError::Table`] if it has no header row or ragged rows.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    /// Parse table text; `path` is only used for error messages
    ///
    /// # Errors
    ///
    /// See [`Table::read`].
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
        let (content, delimiter) = if first_line.contains(',') {
            (text.to_string(), b',')
        } else {
            let normalised: Vec<String> = text
                .lines()
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join("\t"))
                .filter(|line| !line.is_empty())
                .collect();
            (normalised.join("\n"), b'\t')
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(HydError::table(path, "missing header row"));
        }

        let mut rows = Vec::new();
        for (row_no, record) in reader.records().enumerate() {
            let record = record.map_err(|e| HydError::table(path, format!("row {row_no}: {e}")))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Index of a column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a column that must exist
    ///
    /// # Errors
    ///
    /// Returns [`HydError::Table`] naming the missing column.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| HydError::table(&self.path, format!("missing column '{name}'")))
    }

    /// Error for a cell that does not parse
    pub fn cell_error(&self, row: usize, column: usize, expected: &str) -> HydError {
        HydError::table(
            &self.path,
            format!(
                "row {row}, column '{}': expected {expected}, found '{}'",
                self.headers[column], self.rows[row][column]
            ),
        )
    }
}

/// Parse a numeric cell; empty cells and NaN markers are `None`
pub fn parse_optional_f64(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "-" || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("na") {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a non-negative integer cell, accepting float spellings such as `12.0`
pub fn parse_index(cell: &str) -> Option<usize> {
    let value = parse_optional_f64(cell)?;
    (value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}
