//! ENVI header parsing
//!
//! An ENVI header is a small text file of `key = value` pairs in which values
//! wrapped in `{ ... }` may span several lines. Keys are matched
//! case-insensitively. The generic key/value parse is followed by a typed
//! validation step that produces a [`CubeHeader`]: the raster layout, the
//! wavelength list, the good-band flags and a sensor-specific variant that
//! carries the acquisition time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

/// Raw `key = value` fields of an ENVI header
#[derive(Debug, Clone, Default)]
pub struct EnviFields {
    fields: BTreeMap<String, String>,
}

impl EnviFields {
    /// Parse the text of an ENVI header
    ///
    /// # Errors
    ///
    /// Returns a message if the magic `ENVI` line is missing or a `{` block
    /// is never closed.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut lines = text.lines();
        match lines.next() {
            Some(first) if first.trim().eq_ignore_ascii_case("ENVI") => {}
            _ => return Err("header does not start with 'ENVI'".to_string()),
        }

        let mut fields = BTreeMap::new();
        let mut pending: Option<(String, String)> = None;

        for line in lines {
            if let Some((key, mut value)) = pending.take() {
                value.push('\n');
                value.push_str(line);
                if line.contains('}') {
                    fields.insert(key, value);
                } else {
                    pending = Some((key, value));
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if value.starts_with('{') && !value.contains('}') {
                pending = Some((key, value));
            } else {
                fields.insert(key, value);
            }
        }

        if let Some((key, _)) = pending {
            return Err(format!("unterminated '{{' block for field '{key}'"));
        }
        Ok(Self { fields })
    }

    /// Raw value of a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    fn required(&self, key: &str) -> Result<&str, String> {
        self.get(key)
            .ok_or_else(|| format!("missing required header field '{key}'"))
    }

    fn required_usize(&self, key: &str) -> Result<usize, String> {
        let raw = self.required(key)?;
        raw.parse()
            .map_err(|_| format!("header field '{key}' is not an integer: '{raw}'"))
    }

    fn optional_usize(&self, key: &str, default: usize) -> Result<usize, String> {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("header field '{key}' is not an integer: '{raw}'")),
            None => Ok(default),
        }
    }

    /// Items of a `{ a, b, c }` list field
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|raw| {
            raw.trim()
                .trim_start_matches('{')
                .trim_end_matches('}')
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Element type of the binary payload, by ENVI `data type` code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
    U32,
    I64,
    U64,
}

impl DataType {
    /// Map an ENVI data type code onto a supported element type
    #[must_use]
    pub const fn from_code(code: usize) -> Option<Self> {
        match code {
            1 => Some(Self::U8),
            2 => Some(Self::I16),
            3 => Some(Self::I32),
            4 => Some(Self::F32),
            5 => Some(Self::F64),
            12 => Some(Self::U16),
            13 => Some(Self::U32),
            14 => Some(Self::I64),
            15 => Some(Self::U64),
            _ => None,
        }
    }

    /// Size of one element in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 | Self::I64 | Self::U64 => 8,
        }
    }
}

/// Ordering of rows, columns and bands in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interleave {
    /// Band sequential: band, row, column
    Bsq,
    /// Band interleaved by line: row, band, column
    Bil,
    /// Band interleaved by pixel: row, column, band
    Bip,
}

/// Byte order of multi-byte payload elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Geometry and encoding of a cube payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterLayout {
    pub rows: usize,
    pub columns: usize,
    pub bands: usize,
    pub header_offset: usize,
    pub data_type: DataType,
    pub interleave: Interleave,
    pub endianness: Endianness,
}

impl RasterLayout {
    fn from_fields(fields: &EnviFields) -> Result<Self, String> {
        let columns = fields.required_usize("samples")?;
        let rows = fields.required_usize("lines")?;
        let bands = fields.required_usize("bands")?;
        if rows == 0 || columns == 0 || bands == 0 {
            return Err(format!(
                "cube dimensions must be positive, got {rows}x{columns}x{bands}"
            ));
        }

        let code = fields.required_usize("data type")?;
        let data_type =
            DataType::from_code(code).ok_or_else(|| format!("unsupported data type {code}"))?;

        let interleave = match fields
            .get("interleave")
            .map(|raw| raw.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("bsq") => Interleave::Bsq,
            Some("bil") => Interleave::Bil,
            Some("bip") => Interleave::Bip,
            Some(other) => return Err(format!("unknown interleave '{other}'")),
        };

        let endianness = match fields.optional_usize("byte order", 0)? {
            0 => Endianness::Little,
            1 => Endianness::Big,
            other => return Err(format!("unknown byte order {other}")),
        };

        let layout = Self {
            rows,
            columns,
            bands,
            header_offset: fields.optional_usize("header offset", 0)?,
            data_type,
            interleave,
            endianness,
        };
        if layout.payload_len().is_none() {
            return Err(format!(
                "cube dimensions {rows}x{columns}x{bands} overflow the addressable payload size"
            ));
        }
        Ok(layout)
    }

    /// Expected payload size in bytes, excluding the header offset
    ///
    /// `None` if the size does not fit in `usize`.
    #[must_use]
    pub fn payload_len(&self) -> Option<usize> {
        self.rows
            .checked_mul(self.columns)?
            .checked_mul(self.bands)?
            .checked_mul(self.data_type.size())
    }
}

/// How a sensor records its acquisition time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    CubertUhd185,
    Generic,
}

/// Per-sensor header conventions
#[derive(Debug)]
pub struct SensorProfile {
    pub kind: SensorKind,
    /// Lowercase fragments of the `sensor type` field that select this profile
    pub matches: &'static [&'static str],
    /// Extensions tried, in order, for the payload file next to the header
    pub payload_extensions: &'static [&'static str],
}

/// Known sensors. The last entry is the fallback.
pub static SENSOR_PROFILES: &[SensorProfile] = &[
    SensorProfile {
        kind: SensorKind::CubertUhd185,
        matches: &["uhd", "cubert"],
        payload_extensions: &["cue"],
    },
    SensorProfile {
        kind: SensorKind::Generic,
        matches: &[],
        payload_extensions: &["img", "raw", "dat", "bsq", "bil", "bip"],
    },
];

/// Pick the profile for a `sensor type` value
pub fn sensor_profile(sensor_type: Option<&str>) -> &'static SensorProfile {
    let sensor_type = sensor_type.unwrap_or_default().to_ascii_lowercase();
    SENSOR_PROFILES
        .iter()
        .find(|profile| {
            profile
                .matches
                .iter()
                .any(|fragment| sensor_type.contains(fragment))
        })
        .unwrap_or(&SENSOR_PROFILES[SENSOR_PROFILES.len() - 1])
}

/// Sensor-specific acquisition metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorHeader {
    /// Cubert UHD-185: date and 12-hour time in the `description` block
    CubertUhd185 {
        recorded_date: NaiveDate,
        recorded_time: NaiveTime,
    },
    /// Any other sensor: an `acquisition time` field, with or without a date
    Generic {
        acquisition_date: Option<NaiveDate>,
        acquisition_time: NaiveTime,
    },
}

impl SensorHeader {
    fn from_fields(kind: SensorKind, fields: &EnviFields) -> Result<Self, String> {
        match kind {
            SensorKind::CubertUhd185 => {
                let description = fields.required("description")?;
                let (recorded_date, recorded_time) = parse_cubert_description(description)?;
                Ok(Self::CubertUhd185 {
                    recorded_date,
                    recorded_time,
                })
            }
            SensorKind::Generic => {
                let raw = fields.required("acquisition time")?;
                let (acquisition_date, acquisition_time) = parse_acquisition_time(raw)?;
                Ok(Self::Generic {
                    acquisition_date,
                    acquisition_time,
                })
            }
        }
    }

    /// Local time of day at which the cube was recorded
    #[must_use]
    pub fn time_of_day(&self) -> NaiveTime {
        match self {
            Self::CubertUhd185 { recorded_time, .. } => *recorded_time,
            Self::Generic {
                acquisition_time, ..
            } => *acquisition_time,
        }
    }

    /// Local date stated in the header, if any
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::CubertUhd185 { recorded_date, .. } => Some(*recorded_date),
            Self::Generic {
                acquisition_date, ..
            } => *acquisition_date,
        }
    }
}

/// Parse a Cubert description block:
///
/// ```text
/// {
/// Date: 05/17/2017,
/// Time: 6:02:24.34 P,
/// }
/// ```
fn parse_cubert_description(description: &str) -> Result<(NaiveDate, NaiveTime), String> {
    let mut date = None;
    let mut time = None;

    for line in description.lines() {
        let line = line
            .trim()
            .trim_start_matches('{')
            .trim_end_matches('}')
            .trim()
            .trim_end_matches(',');
        if let Some(raw) = line.strip_prefix("Date:") {
            date = Some(
                NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y")
                    .map_err(|e| format!("invalid description date '{}': {e}", raw.trim()))?,
            );
        } else if let Some(raw) = line.strip_prefix("Time:") {
            time = Some(parse_twelve_hour_time(raw.trim())?);
        }
    }

    match (date, time) {
        (Some(date), Some(time)) => Ok((date, time)),
        (None, _) => Err("description block has no 'Date:' line".to_string()),
        (_, None) => Err("description block has no 'Time:' line".to_string()),
    }
}

/// Parse `6:02:24.34 P` into 18:02:24; fractional seconds are dropped
fn parse_twelve_hour_time(raw: &str) -> Result<NaiveTime, String> {
    let mut parts = raw.split_whitespace();
    let clock = parts.next().unwrap_or_default();
    let meridiem = parts
        .next()
        .and_then(|m| m.chars().next())
        .map(|c| c.to_ascii_uppercase());

    let fields: Vec<&str> = clock.split(':').collect();
    let [hour, minute, second] = fields.as_slice() else {
        return Err(format!("invalid description time '{raw}'"));
    };
    let invalid = || format!("invalid description time '{raw}'");
    let mut hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    let second: f64 = second.parse().map_err(|_| invalid())?;

    match meridiem {
        Some('P') if hour < 12 => hour += 12,
        Some('A') if hour == 12 => hour = 0,
        Some('A' | 'P') | None => {}
        Some(other) => return Err(format!("unknown meridiem '{other}' in '{raw}'")),
    }

    NaiveTime::from_hms_opt(hour, minute, second.trunc() as u32).ok_or_else(invalid)
}

fn parse_acquisition_time(raw: &str) -> Result<(Option<NaiveDate>, NaiveTime), String> {
    let raw = raw.trim().trim_end_matches('Z');
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok((Some(datetime.date()), datetime.time()));
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .map(|time| (None, time))
        .map_err(|e| format!("invalid acquisition time '{raw}': {e}"))
}

/// Validated header of one cube
#[derive(Debug, Clone)]
pub struct CubeHeader {
    pub layout: RasterLayout,
    /// Centre wavelength of every band
    pub wavelengths: Vec<f64>,
    /// `true` for bands the bad-band list marks as usable
    pub good_bands: Vec<bool>,
    pub sensor: SensorHeader,
    pub profile: &'static SensorProfile,
}

impl CubeHeader {
    /// Validate a header
    ///
    /// `layout_fields` describe the payload; `meta_fields` supply the sensor
    /// type, acquisition time, wavelengths and bad-band list. Both are the
    /// same header unless a high-resolution companion header exists.
    ///
    /// # Errors
    ///
    /// Returns a message for missing or inconsistent fields.
    pub fn from_fields(layout_fields: &EnviFields, meta_fields: &EnviFields) -> Result<Self, String> {
        let layout = RasterLayout::from_fields(layout_fields)?;

        let sensor_type = meta_fields
            .get("sensor type")
            .or_else(|| layout_fields.get("sensor type"));
        let profile = sensor_profile(sensor_type);
        let sensor = SensorHeader::from_fields(profile.kind, meta_fields)?;

        let mut wavelengths = meta_fields
            .list("wavelength")
            .ok_or_else(|| "missing required header field 'wavelength'".to_string())?
            .iter()
            .map(|item| {
                item.parse::<f64>()
                    .map_err(|_| format!("invalid wavelength '{item}'"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut good_bands = match meta_fields.list("bbl") {
            Some(items) => items
                .iter()
                .map(|item| match item.parse::<f64>() {
                    Ok(flag) => Ok(flag != 0.0),
                    Err(_) => Err(format!("invalid bad-band flag '{item}'")),
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![true; wavelengths.len()],
        };

        if good_bands.len() != wavelengths.len() {
            return Err(format!(
                "wavelength list ({}) and bad-band list ({}) differ in length",
                wavelengths.len(),
                good_bands.len()
            ));
        }

        // Some exports prepend a zero wavelength that has no band in the payload
        if wavelengths.len() == layout.bands + 1 && wavelengths.first() == Some(&0.0) {
            wavelengths.remove(0);
            good_bands.remove(0);
        }

        if wavelengths.len() != layout.bands {
            return Err(format!(
                "header declares {} bands but lists {} wavelengths",
                layout.bands,
                wavelengths.len()
            ));
        }

        Ok(Self {
            layout,
            wavelengths,
            good_bands,
            sensor,
            profile,
        })
    }
}

/// Column label for a wavelength, in nanometres
///
/// Values below 5 are taken as micrometres, values above 200 as nanometres.
///
/// # Errors
///
/// Returns a message for anything in between.
pub fn wavelength_label(wavelength: f64) -> Result<String, String> {
    if wavelength < 5.0 {
        return Ok(format!("{}", (wavelength * 1000.0) as i64));
    }
    if wavelength > 200.0 {
        return Ok(format!("{}", wavelength as i64));
    }
    Err(format!("cannot convert wavelength {wavelength}"))
}
