//! Run options consumed by the pipeline
//!
//! The options are a plain record. Nothing here reads configuration files;
//! the CLI (or any other caller) fills the record and calls
//! [`RunOptions::validate`] once before processing starts.

use crate::errors::{HydError, Result};
use crate::mask::BarModel;
use crate::statistics::SummaryStatistic;
use chrono::{Duration, FixedOffset};
use std::path::PathBuf;

/// Options that control how cubes are summarised and joined
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Per-band statistic used to summarise a zone
    pub statistic: SummaryStatistic,
    /// A zone needs at least this many included pixels
    pub min_zone_pixels: usize,
    /// A zone needs at least this fraction of its clipped area included
    pub min_coverage_fraction: f64,
    /// Largest accepted distance between a cube and a joined reading
    pub max_time_delta: Duration,
    /// Offset of the local clock used in folder names, headers and LWIR file names
    pub utc_offset_minutes: i32,
    /// Rasterisation rule for wooden bars
    pub bar_model: BarModel,
    /// Restrict features to the bands flagged good in the header
    pub drop_bad_bands: bool,
    /// Text written for unjoined values when exporting
    pub missing_marker: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            statistic: SummaryStatistic::Mean,
            min_zone_pixels: 1,
            min_coverage_fraction: 0.0,
            max_time_delta: Duration::minutes(3),
            utc_offset_minutes: 120,
            bar_model: BarModel::Quadrilateral,
            drop_bad_bands: false,
            missing_marker: "NaN".to_string(),
        }
    }
}

impl RunOptions {
    /// Check the options before any file is touched
    ///
    /// # Errors
    ///
    /// Returns [`HydError::Configuration`] for a coverage fraction outside
    /// `[0, 1]`, a negative time delta, or an impossible UTC offset.
    pub fn validate(&self) -> Result<()> {
        if !self.min_coverage_fraction.is_finite()
            || !(0.0..=1.0).contains(&self.min_coverage_fraction)
        {
            return Err(HydError::Configuration(format!(
                "minimum coverage fraction must lie in [0, 1], got {}",
                self.min_coverage_fraction
            )));
        }
        if self.max_time_delta < Duration::zero() {
            return Err(HydError::Configuration(format!(
                "maximum join time delta must not be negative, got {} s",
                self.max_time_delta.num_seconds()
            )));
        }
        self.local_offset()?;
        Ok(())
    }

    /// The local clock offset as a chrono [`FixedOffset`]
    pub fn local_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            HydError::Configuration(format!(
                "UTC offset of {} minutes is out of range",
                self.utc_offset_minutes
            ))
        })
    }

    /// Zone pixel count below which a zone is rejected
    #[must_use]
    pub fn required_pixels(&self, zone_area: usize) -> usize {
        let by_fraction = (self.min_coverage_fraction * zone_area as f64).ceil() as usize;
        self.min_zone_pixels.max(by_fraction).max(1)
    }
}

/// Convert a join window given in minutes into a [`Duration`]
///
/// # Errors
///
/// Returns [`HydError::Configuration`] for a negative or non-finite value,
/// or one too large to represent.
pub fn time_delta_from_minutes(minutes: f64) -> Result<Duration> {
    if !minutes.is_finite() || minutes < 0.0 {
        return Err(HydError::Configuration(format!(
            "maximum join time delta must be a non-negative number of minutes, got {minutes}"
        )));
    }
    let millis = (minutes * 60_000.0).round();
    // i64::MAX is not exactly representable; anything at or above it is out of range
    if millis >= i64::MAX as f64 {
        return Err(HydError::Configuration(format!(
            "maximum join time delta of {minutes} minutes is out of range"
        )));
    }
    Duration::try_milliseconds(millis as i64).ok_or_else(|| {
        HydError::Configuration(format!(
            "maximum join time delta of {minutes} minutes is out of range"
        ))
    })
}

/// Locations of every input of a run
///
/// Only the hyperspectral root is mandatory. A missing auxiliary input
/// behaves like an empty table.
#[derive(Debug, Clone, Default)]
pub struct InputPaths {
    pub hyp_root: PathBuf,
    pub lwir_root: Option<PathBuf>,
    pub tdr: Option<PathBuf>,
    pub site: Option<PathBuf>,
    pub positions_hyp: Option<PathBuf>,
    pub positions_lwir: Option<PathBuf>,
    pub masks: Option<PathBuf>,
    pub ignore_measurements: Option<PathBuf>,
    pub ignore_datapoints: Option<PathBuf>,
    pub ignore_zones: Option<PathBuf>,
}
