//! Defines command-line interface options using `clap` for the hydresgeo application.

use clap::Parser;
use hydresgeo::mask::BarModel;
use hydresgeo::options::{time_delta_from_minutes, InputPaths, RunOptions};
use hydresgeo::statistics::SummaryStatistic;
use std::path::PathBuf;

/// Build a zone-level dataset from hyperspectral, LWIR and TDR measurements
#[derive(Parser, Debug)]
#[command(
    version = "1.1.0",
    name = "hydresgeo",
    about = "Aligns hyperspectral cubes with LWIR, soil moisture and site data"
)]
pub struct Args {
    /// Root folder holding the `YYYYmmdd_hyp_measN` measurement folders
    #[arg(long)]
    pub hyp_root: PathBuf,

    /// Folder of LWIR frame exports
    #[arg(long)]
    pub lwir_root: Option<PathBuf>,

    /// TDR soil moisture table
    #[arg(long)]
    pub tdr: Option<PathBuf>,

    /// Site metadata table
    #[arg(long)]
    pub site: Option<PathBuf>,

    /// Zone positions for the hyperspectral camera
    #[arg(long)]
    pub positions_hyp: Option<PathBuf>,

    /// Zone positions for the LWIR camera
    #[arg(long)]
    pub positions_lwir: Option<PathBuf>,

    /// Crop and bar definitions
    #[arg(long)]
    pub masks: Option<PathBuf>,

    /// Table of ignored measurements
    #[arg(long)]
    pub ignore_measurements: Option<PathBuf>,

    /// Table of ignored datapoints
    #[arg(long)]
    pub ignore_datapoints: Option<PathBuf>,

    /// Table of ignored zones
    #[arg(long)]
    pub ignore_zones: Option<PathBuf>,

    /// Per-band zone statistic: mean, median, std, max or max10
    #[arg(long, default_value = "mean", value_parser = parse_statistic)]
    pub statistic: SummaryStatistic,

    /// Bar rasterisation: quadrilateral or line-band
    #[arg(long, default_value = "quadrilateral", value_parser = parse_bar_model)]
    pub bar_model: BarModel,

    /// Minimum number of usable pixels per zone
    #[arg(long, default_value_t = 1)]
    pub min_zone_pixels: usize,

    /// Minimum usable fraction of a zone's area, in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    pub min_coverage: f64,

    /// Largest time difference, in minutes, for joining auxiliary readings
    #[arg(long = "max-delta-minutes", default_value = "3", value_parser = parse_minutes)]
    pub max_time_delta: chrono::Duration,

    /// Offset of the local acquisition clock from UTC, in minutes
    #[arg(long, default_value_t = 120, allow_hyphen_values = true)]
    pub utc_offset_minutes: i32,

    /// Keep only the bands marked good in the header's bad-band list
    #[arg(long, default_value_t = false)]
    pub drop_bad_bands: bool,

    /// Text written for values that could not be joined
    #[arg(long, default_value = "NaN")]
    pub missing_marker: String,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Path of the dataset CSV. If not set, writes to standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path of the diagnostics JSON report
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    pub fn input_paths(&self) -> InputPaths {
        InputPaths {
            hyp_root: self.hyp_root.clone(),
            lwir_root: self.lwir_root.clone(),
            tdr: self.tdr.clone(),
            site: self.site.clone(),
            positions_hyp: self.positions_hyp.clone(),
            positions_lwir: self.positions_lwir.clone(),
            masks: self.masks.clone(),
            ignore_measurements: self.ignore_measurements.clone(),
            ignore_datapoints: self.ignore_datapoints.clone(),
            ignore_zones: self.ignore_zones.clone(),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            statistic: self.statistic,
            min_zone_pixels: self.min_zone_pixels,
            min_coverage_fraction: self.min_coverage,
            max_time_delta: self.max_time_delta,
            utc_offset_minutes: self.utc_offset_minutes,
            bar_model: self.bar_model,
            drop_bad_bands: self.drop_bad_bands,
            missing_marker: self.missing_marker.clone(),
        }
    }
}

fn parse_statistic(s: &str) -> Result<SummaryStatistic, String> {
    s.parse()
}

fn parse_bar_model(s: &str) -> Result<BarModel, String> {
    s.parse()
}

fn parse_minutes(s: &str) -> Result<chrono::Duration, String> {
    let minutes: f64 = s
        .parse()
        .map_err(|_| format!("Invalid number of minutes: '{s}'"))?;
    time_delta_from_minutes(minutes).map_err(|e| e.to_string())
}
