//! Centralized error handling for hydresgeo
//!
//! Every fallible operation in the crate returns [`Result`]. The variants map
//! onto the pipeline's error taxonomy: per-file problems (`Format`, `Io`) are
//! caught by the assembler and turned into diagnostics, while configuration
//! and auxiliary-table problems abort the run before any cube is processed.

use std::path::PathBuf;

/// Main error type for hydresgeo operations
#[derive(Debug, thiserror::Error)]
pub enum HydError {
    /// Malformed cube header or payload, or an unparseable timestamp
    #[error("Format error in {path}: {message}")]
    Format { path: PathBuf, message: String },

    /// Invalid run options
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed auxiliary table (masks, positions, ignore lists, timeseries)
    #[error("Table error in {path}: {message}")]
    Table { path: PathBuf, message: String },

    /// A zone has fewer included pixels than the coverage threshold
    #[error("Zone '{zone}' has {pixels} usable pixels, {required} required")]
    Coverage {
        zone: String,
        pixels: usize,
        required: usize,
    },

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialisation errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),
}

impl HydError {
    /// Build a [`HydError::Format`] for the given file
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HydError::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a [`HydError::Table`] for the given file
    pub fn table(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HydError::Table {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for hydresgeo operations
pub type Result<T> = std::result::Result<T, HydError>;
