//! Long-wave infrared frames
//!
//! The thermal camera exports one CSV per frame, named
//! `ir_export_<YYYYmmdd>_<...>_<HH-MM-SS>.csv` in local time. Each file is a
//! matrix of temperatures. The archive loads every frame up front; a zone's
//! LWIR summary is taken from the frame closest in time to the cube, inside
//! the zone's LWIR-resolution rectangle.

use super::nearest::find_nearest;
use super::GapReason;
use crate::errors::{HydError, Result};
use crate::mask::Bounds;
use crate::statistics::SummaryStatistic;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use ndarray::Array2;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// One thermal frame
#[derive(Debug, Clone)]
pub struct LwirFrame {
    pub time: DateTime<Utc>,
    pub path: PathBuf,
    /// Temperatures indexed by (row, column)
    pub data: Array2<f64>,
}

/// LWIR statistics of one zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LwirSummary {
    pub time: DateTime<Utc>,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

/// All frames of a run, ordered by time
#[derive(Debug, Clone, Default)]
pub struct LwirArchive {
    times: Vec<DateTime<Utc>>,
    frames: Vec<LwirFrame>,
}

impl LwirArchive {
    pub fn from_frames(mut frames: Vec<LwirFrame>) -> Self {
        frames.sort_by_key(|f| f.time);
        Self {
            times: frames.iter().map(|f| f.time).collect(),
            frames,
        }
    }

    /// Load every frame of a directory
    ///
    /// Files that do not follow the export naming scheme are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`HydError::Io`] if the directory cannot be listed and
    /// [`HydError::Table`] for a frame that does not parse.
    pub fn read_dir(dir: &Path, local_offset: FixedOffset) -> Result<Self> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let Some(time) = frame_time(name, local_offset) else {
                log::debug!("skipping {}: not an LWIR export", path.display());
                continue;
            };
            let data = read_frame(&path)?;
            frames.push(LwirFrame { time, path, data });
        }
        log::info!("loaded {} LWIR frames from {}", frames.len(), dir.display());
        Ok(Self::from_frames(frames))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame closest to `time`, earlier frame on ties, if within `max_delta`
    ///
    /// # Errors
    ///
    /// Returns [`GapReason::NoSeries`] for an empty archive and
    /// [`GapReason::TooFar`] when the closest frame is too far away.
    pub fn nearest(
        &self,
        time: DateTime<Utc>,
        max_delta: Duration,
    ) -> std::result::Result<&LwirFrame, GapReason> {
        match find_nearest(&self.times, time) {
            None => Err(GapReason::NoSeries),
            Some((index, delta)) if delta <= max_delta => Ok(&self.frames[index]),
            Some((_, delta)) => Err(GapReason::TooFar { delta }),
        }
    }
}

/// Local acquisition time encoded in an export file name, as UTC
pub fn frame_time(file_name: &str, local_offset: FixedOffset) -> Option<DateTime<Utc>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^ir_export_(\d{8})_.*_(\d{2}-\d{2}-\d{2})\.csv$").expect("valid regex")
    });
    let captures = pattern.captures(file_name)?;
    let local =
        NaiveDateTime::parse_from_str(&format!("{} {}", &captures[1], &captures[2]), "%Y%m%d %H-%M-%S")
            .ok()?;
    local_offset
        .from_local_datetime(&local)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

/// Read a temperature matrix; lines that are not fully numeric are skipped
///
/// Semicolon-separated exports may use decimal commas.
///
/// # Errors
///
/// Returns [`HydError::Table`] for ragged or empty matrices.
pub fn read_frame(path: &Path) -> Result<Array2<f64>> {
    let text = std::fs::read_to_string(path)?;
    let delimiter = if text.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut width = None;
    let mut height = 0;
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Option<Vec<f64>> = record
            .iter()
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(|cell| {
                let cell = if delimiter == b';' {
                    cell.replace(',', ".")
                } else {
                    cell.to_string()
                };
                cell.parse::<f64>().ok()
            })
            .collect();
        let Some(row) = row.filter(|r| !r.is_empty()) else {
            continue;
        };
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(HydError::table(
                    path,
                    format!("row {height} has {} values, expected {w}", row.len()),
                ));
            }
            Some(_) => {}
        }
        values.extend(row);
        height += 1;
    }

    let width = width.ok_or_else(|| HydError::table(path, "no numeric rows"))?;
    Ok(Array2::from_shape_vec((height, width), values)?)
}

/// Mean, median and standard deviation of a frame inside `bounds` (clipped)
///
/// # Errors
///
/// Returns [`GapReason::NoDefinition`] when the clipped rectangle is empty.
pub fn summarize_frame(
    frame: &LwirFrame,
    bounds: &Bounds,
) -> std::result::Result<LwirSummary, GapReason> {
    let (rows, columns) = frame.data.dim();
    let clipped = bounds.clip(rows, columns);
    if clipped.area() == 0 {
        return Err(GapReason::NoDefinition);
    }
    let values: Vec<f64> = frame
        .data
        .slice(ndarray::s![
            clipped.row_start..clipped.row_end,
            clipped.col_start..clipped.col_end
        ])
        .iter()
        .copied()
        .collect();

    Ok(LwirSummary {
        time: frame.time,
        mean: SummaryStatistic::Mean.apply(&values),
        median: SummaryStatistic::Median.apply(&values),
        std: SummaryStatistic::Std.apply(&values),
    })
}
