//! Timestamped series
//!
//! A [`Timeseries`] holds rows of values sorted by time and answers
//! nearest-timestamp queries. Series are built once and only read afterwards,
//! so they can be shared between worker threads without locking.

use crate::join::nearest::find_nearest;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Parse a timestamp as written by the loggers and exports
///
/// Offsets are honoured; timestamps without one are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(t) = DateTime::parse_from_str(raw, format) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    None
}

/// Result of a nearest-timestamp lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Nearest<'a> {
    /// A row within the allowed distance
    Found {
        time: DateTime<Utc>,
        values: &'a [f64],
    },
    /// The closest row is further away than allowed
    TooFar { delta: Duration },
    /// The series has no rows
    Empty,
}

/// Rows of named values ordered by time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeseries {
    columns: Vec<String>,
    times: Vec<DateTime<Utc>>,
    values: Vec<Vec<f64>>,
}

impl Timeseries {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a series from unordered rows; rows with equal times keep their order
    pub fn from_rows(columns: Vec<String>, rows: Vec<(DateTime<Utc>, Vec<f64>)>) -> Self {
        let mut rows = rows;
        rows.sort_by_key(|(time, _)| *time);
        let (times, values) = rows.into_iter().unzip();
        Self {
            columns,
            times,
            values,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Row closest to `time`, earlier row on ties, if within `max_delta`
    #[must_use]
    pub fn nearest(&self, time: DateTime<Utc>, max_delta: Duration) -> Nearest<'_> {
        match find_nearest(&self.times, time) {
            None => Nearest::Empty,
            Some((index, delta)) if delta <= max_delta => Nearest::Found {
                time: self.times[index],
                values: &self.values[index],
            },
            Some((_, delta)) => Nearest::TooFar { delta },
        }
    }
}
