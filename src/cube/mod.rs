//! Hyperspectral cube reading
//!
//! A cube on disk is an ENVI header (`AutoNNN.hdr`), a raw payload next to it
//! (`AutoNNN.cue` for the Cubert camera) and optionally a high-resolution
//! companion header (`AutoNNN_highres.hdr`) whose metadata takes precedence.
//! Cubes live in measurement folders named `YYYYmmdd_hyp_measN`; the folder
//! supplies the measurement name and the acquisition date, the header the
//! time of day.
//!
//! # Organization
//!
//! - [`header`]: ENVI header parsing and sensor profiles
//! - [`payload`]: binary payload decoding

pub mod header;
pub mod payload;

pub use header::{wavelength_label, CubeHeader, EnviFields, RasterLayout, SensorHeader};

use crate::errors::{HydError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use ndarray::Array3;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Identity of one datapoint: a cube file within a measurement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatapointId {
    pub measurement: String,
    pub file_number: u32,
}

impl fmt::Display for DatapointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{:03}", self.measurement, self.file_number)
    }
}

fn folder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{8})_hyp_(meas\d+)$").expect("valid regex"))
}

fn file_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\D*?(\d+)$").expect("valid regex"))
}

/// Measurement name of a folder: `20170815_hyp_meas1` becomes `20170815_meas1`
#[must_use]
pub fn measurement_name(folder_name: &str) -> String {
    folder_name.replacen("_hyp", "", 1)
}

/// Acquisition date encoded in a `YYYYmmdd_hyp_measN` folder name
///
/// # Errors
///
/// Returns [`HydError::Format`] if the name does not follow the pattern or
/// the date does not exist.
pub fn folder_date(folder: &Path) -> Result<NaiveDate> {
    let name = folder
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let captures = folder_pattern().captures(name).ok_or_else(|| {
        HydError::format(folder, format!("folder '{name}' does not match YYYYmmdd_hyp_measN"))
    })?;
    NaiveDate::parse_from_str(&captures[1], "%Y%m%d")
        .map_err(|e| HydError::format(folder, format!("invalid date in folder '{name}': {e}")))
}

/// File number of a header stem such as `Auto017`
#[must_use]
pub fn file_number(stem: &str) -> Option<u32> {
    file_number_pattern()
        .captures(stem)
        .and_then(|c| c[1].parse().ok())
}

/// One decoded hyperspectral image
#[derive(Debug, Clone)]
pub struct Cube {
    pub id: DatapointId,
    pub header: CubeHeader,
    /// Values indexed by (row, column, band)
    pub data: Array3<f32>,
    pub timestamp: DateTime<Utc>,
}

impl Cube {
    /// Spatial extent as (rows, columns)
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        let (rows, columns, _) = self.data.dim();
        (rows, columns)
    }

    #[must_use]
    pub fn band_count(&self) -> usize {
        self.data.dim().2
    }

    /// `true` if every value is zero, as written for failed acquisitions
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }
}

/// Reads cubes, turning local acquisition times into UTC
#[derive(Debug, Clone)]
pub struct CubeReader {
    local_offset: FixedOffset,
}

impl CubeReader {
    pub fn new(local_offset: FixedOffset) -> Self {
        Self { local_offset }
    }

    /// Read and validate the cube described by `header_path`
    ///
    /// # Errors
    ///
    /// Returns [`HydError::Format`] for a malformed header, a payload of the
    /// wrong size or an unparseable timestamp, and [`HydError::Io`] when a
    /// file cannot be read.
    pub fn read(&self, header_path: &Path) -> Result<Cube> {
        let folder = header_path.parent().unwrap_or_else(|| Path::new(""));
        let folder_name = folder
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = header_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let file_number = file_number(stem).ok_or_else(|| {
            HydError::format(header_path, format!("no file number in '{stem}'"))
        })?;
        let id = DatapointId {
            measurement: measurement_name(folder_name),
            file_number,
        };

        let header = read_header(header_path)?;
        let date = folder_date(folder)?;
        if let Some(stated) = header.sensor.date() {
            if stated != date {
                log::warn!(
                    "{id}: header date {stated} differs from folder date {date}, using folder date"
                );
            }
        }
        let local = date.and_time(header.sensor.time_of_day());
        let timestamp = self
            .local_offset
            .from_local_datetime(&local)
            .single()
            .ok_or_else(|| HydError::format(header_path, format!("ambiguous local time {local}")))?
            .with_timezone(&Utc);

        let payload_path = payload_path(header_path, &header)?;
        let bytes = std::fs::read(&payload_path)?;
        let data = payload::decode_payload(&bytes, &header.layout)
            .map_err(|message| HydError::format(&payload_path, message))?;

        log::debug!(
            "{id}: read {}x{}x{} cube acquired {timestamp}",
            header.layout.rows,
            header.layout.columns,
            header.layout.bands
        );

        Ok(Cube {
            id,
            header,
            data,
            timestamp,
        })
    }
}

/// Parse a header together with its optional `_highres` companion
///
/// # Errors
///
/// Returns [`HydError::Format`] for malformed headers and [`HydError::Io`]
/// when the header cannot be read.
pub fn read_header(header_path: &Path) -> Result<CubeHeader> {
    let parse = |path: &Path| -> Result<EnviFields> {
        let text = std::fs::read_to_string(path)?;
        EnviFields::parse(&text).map_err(|message| HydError::format(path, message))
    };

    let layout_fields = parse(header_path)?;
    let highres = highres_path(header_path);
    let header = if highres.is_file() {
        let meta_fields = parse(&highres)?;
        CubeHeader::from_fields(&layout_fields, &meta_fields)
            .map_err(|message| HydError::format(&highres, message))?
    } else {
        CubeHeader::from_fields(&layout_fields, &layout_fields)
            .map_err(|message| HydError::format(header_path, message))?
    };
    Ok(header)
}

/// `AutoNNN.hdr` -> `AutoNNN_highres.hdr`
#[must_use]
pub fn highres_path(header_path: &Path) -> PathBuf {
    let stem = header_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    header_path.with_file_name(format!("{stem}_highres.hdr"))
}

fn payload_path(header_path: &Path, header: &CubeHeader) -> Result<PathBuf> {
    header
        .profile
        .payload_extensions
        .iter()
        .map(|ext| header_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            HydError::format(
                header_path,
                format!(
                    "no payload file with extension {:?} next to header",
                    header.profile.payload_extensions
                ),
            )
        })
}
