//! Assembled zone records and CSV export
//!
//! A [`Dataset`] holds one [`ZoneRecord`] per valid zone, sorted by
//! (measurement, file number, zone). All records share the band layout of
//! [`Dataset::wavelengths`].

use crate::cube::{wavelength_label, DatapointId};
use crate::errors::Result;
use crate::join::{HydroReading, LwirSummary, SiteReading};
use crate::zones::ZoneId;
use chrono::{DateTime, Utc};
use std::io::Write;

/// Columns written before the band features
pub const KEY_COLUMNS: [&str; 4] = ["measurement", "file_number", "zone", "timestamp"];
/// Columns written after the band features, before the site columns
pub const JOINED_COLUMNS: [&str; 5] = [
    "vol_sm",
    "soil_temp",
    "lwir_mean",
    "lwir_median",
    "lwir_std",
];

/// Summary of one zone of one cube, with its joined auxiliary values
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    pub id: DatapointId,
    pub zone: ZoneId,
    pub timestamp: DateTime<Utc>,
    /// One value per dataset wavelength
    pub features: Vec<f64>,
    /// Number of pixels the features were computed from
    pub pixel_count: usize,
    pub hydro: Option<HydroReading>,
    pub lwir: Option<LwirSummary>,
    pub site: Option<SiteReading>,
}

impl ZoneRecord {
    /// Unique key of the record
    #[must_use]
    pub fn key(&self) -> (&str, u32, ZoneId) {
        (&self.id.measurement, self.id.file_number, self.zone)
    }
}

/// The aligned dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Band centre wavelengths shared by every record
    pub wavelengths: Vec<f64>,
    /// Value columns of the site table
    pub site_columns: Vec<String>,
    pub records: Vec<ZoneRecord>,
}

impl Dataset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sort records by (measurement, file number, zone)
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| a.key().cmp(&b.key()));
    }

    /// Column labels of the band features
    ///
    /// Wavelengths that cannot be expressed in nanometres fall back to
    /// `band<N>`.
    #[must_use]
    pub fn band_labels(&self) -> Vec<String> {
        self.wavelengths
            .iter()
            .enumerate()
            .map(|(i, &w)| wavelength_label(w).unwrap_or_else(|_| format!("band{i}")))
            .collect()
    }

    /// Full CSV header row
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        KEY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.band_labels())
            .chain(JOINED_COLUMNS.iter().map(|c| c.to_string()))
            .chain(self.site_columns.iter().cloned())
            .collect()
    }

    /// Write the dataset as CSV, `missing_marker` standing in for absent values
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::HydError::Csv`] or
    /// [`crate::errors::HydError::Io`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W, missing_marker: &str) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.headers())?;

        let value = |v: Option<f64>| match v {
            Some(v) if v.is_finite() => v.to_string(),
            _ => missing_marker.to_string(),
        };

        for record in &self.records {
            let mut row = vec![
                record.id.measurement.clone(),
                record.id.file_number.to_string(),
                record.zone.to_string(),
                record.timestamp.to_rfc3339(),
            ];
            row.extend(record.features.iter().map(|&f| value(Some(f))));
            row.push(value(record.hydro.map(|h| h.soil_moisture)));
            row.push(value(record.hydro.map(|h| h.soil_temperature)));
            row.push(value(record.lwir.map(|l| l.mean)));
            row.push(value(record.lwir.map(|l| l.median)));
            row.push(value(record.lwir.map(|l| l.std)));
            match &record.site {
                Some(site) => row.extend(site.values.iter().map(|&v| value(Some(v)))),
                None => row.extend(self.site_columns.iter().map(|_| missing_marker.to_string())),
            }
            csv.write_record(&row)?;
        }

        csv.flush()?;
        Ok(())
    }
}
