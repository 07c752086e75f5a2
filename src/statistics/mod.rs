//! Spectral summaries of measurement zones
//!
//! # Organization
//!
//! This module is organized into submodules:
//! - [`operations`]: the selectable per-band statistics
//! - [`parallel`]: zone gathering and band-wise reductions

pub mod operations;
pub mod parallel;

// Re-export the main types and functions for convenience
pub use operations::SummaryStatistic;
pub use parallel::{reduce_bands, summarize_zone, zone_spectra};
