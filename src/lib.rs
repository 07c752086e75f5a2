//! hydresgeo: zone-level alignment of hyperspectral, LWIR and soil data
//!
//! A field experiment records hyperspectral cubes of eight soil plots
//! together with thermal (LWIR) frames, TDR soil moisture sensors and site
//! weather data. This library reads every cube, masks out the crop margins
//! and the wooden bars, cuts the image into the fixed plot zones, summarises
//! each zone into one spectrum and joins the closest auxiliary readings. The
//! result is one table row per (measurement, file, zone).
//!
//! ## Key Features
//!
//! - **ENVI cubes**: header parsing with sensor profiles, `bsq`/`bil`/`bip` payloads
//! - **Masks**: crop rectangles plus bars under two rasterisation models
//! - **Zone statistics**: mean, median, standard deviation, maximum, top-ten mean
//! - **Nearest-time joins**: TDR sensors, LWIR frames and site series
//! - **Parallel Processing**: one Rayon task per cube, deterministic output order
//! - **Diagnostics**: every skipped file or zone and every join gap is reported
//!
//! ## Module Organization
//!
//! - [`cube`]: cube headers, payloads and timestamps
//! - [`mask`]: crop and bar exclusion maps
//! - [`zones`]: zone definitions and partitioning
//! - [`statistics`]: per-band zone summaries
//! - [`join`]: auxiliary timeseries joins
//! - [`tables`]: readers for the definition and ignore tables
//! - [`context`]: the per-run definitions and ignore rules
//! - [`assembler`]: the per-file pipeline over the worker pool
//! - [`dataset`]: zone records and CSV export
//! - [`diagnostics`]: the diagnostics log
//! - [`options`]: run options
//! - [`parallel`]: worker pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hydresgeo::prelude::*;
//!
//! let paths = InputPaths {
//!     hyp_root: "data/hyp".into(),
//!     positions_hyp: Some("config/positions_hyp.txt".into()),
//!     ..InputPaths::default()
//! };
//! let options = RunOptions::default();
//!
//! let context = DatasetContext::load(&paths).unwrap();
//! let tables = AuxiliaryTables::load(&paths, &options).unwrap();
//! let output = DatasetAssembler::new(&context, &tables, &options)
//!     .unwrap()
//!     .run(&paths.hyp_root)
//!     .unwrap();
//!
//! println!("{} zone records", output.dataset.len());
//! ```

pub mod assembler;
pub mod context;
pub mod cube;
pub mod dataset;
pub mod diagnostics;
pub mod errors;
pub mod join;
pub mod mask;
pub mod options;
pub mod parallel;
pub mod statistics;
pub mod tables;
pub mod zones;

pub use errors::{HydError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::assembler::{AssemblyOutput, DatasetAssembler};
    pub use crate::context::{DatasetContext, IgnoreRules};
    pub use crate::cube::{Cube, CubeReader, DatapointId};
    pub use crate::dataset::{Dataset, ZoneRecord};
    pub use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticsLog};
    pub use crate::errors::{HydError, Result};
    pub use crate::join::AuxiliaryTables;
    pub use crate::mask::{BarModel, Bounds, MaskDefinition};
    pub use crate::options::{InputPaths, RunOptions};
    pub use crate::parallel::ParallelConfig;
    pub use crate::statistics::SummaryStatistic;
    pub use crate::zones::{ZoneDefinition, ZoneId};
}
