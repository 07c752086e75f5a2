//! Joining zone records with the auxiliary sensors
//!
//! Each valid zone record is matched with the TDR reading, LWIR frame and
//! site values closest in time to its cube. A match further away than the
//! allowed delta, or a source that is missing altogether, leaves the field
//! empty and is reported as a [`JoinGap`]; the record itself is kept.
//!
//! # Organization
//!
//! - [`nearest`]: nearest-timestamp search with ties going to the earlier row
//! - [`hydro`]: TDR soil moisture and the sensor registry
//! - [`lwir`]: thermal frames
//! - [`site`]: site metadata series

pub mod hydro;
pub mod lwir;
pub mod nearest;
pub mod site;

pub use hydro::{HydroReading, HydroTable, SensorRegistry, SoilSensor};
pub use lwir::{LwirArchive, LwirFrame, LwirSummary};
pub use site::{SiteReading, SiteTable};

use crate::context::DatasetContext;
use crate::cube::DatapointId;
use crate::errors::Result;
use crate::options::{InputPaths, RunOptions};
use crate::zones::{SensorType, ZoneId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

/// Auxiliary data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSource {
    Hydro,
    Lwir,
    Site,
}

impl fmt::Display for JoinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinSource::Hydro => "hydro",
            JoinSource::Lwir => "lwir",
            JoinSource::Site => "site",
        })
    }
}

/// Why a source could not be joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReason {
    /// The source was not supplied for this run
    NoTable,
    /// The source has no rows for this measurement, sensor or zone
    NoSeries,
    /// No LWIR zone rectangle for this zone
    NoDefinition,
    /// The closest row is further away than allowed
    TooFar { delta: Duration },
}

impl fmt::Display for GapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapReason::NoTable => write!(f, "source not supplied"),
            GapReason::NoSeries => write!(f, "no series for this record"),
            GapReason::NoDefinition => write!(f, "no LWIR zone definition"),
            GapReason::TooFar { delta } => {
                write!(f, "closest reading is {} s away", delta.num_seconds())
            }
        }
    }
}

/// A source left empty for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinGap {
    pub source: JoinSource,
    pub reason: GapReason,
}

/// Auxiliary fields of one zone record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedFields {
    pub hydro: Option<HydroReading>,
    pub lwir: Option<LwirSummary>,
    pub site: Option<SiteReading>,
    pub gaps: Vec<JoinGap>,
}

/// Timeseries sources of a run, loaded once
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryTables {
    pub hydro: Option<HydroTable>,
    pub lwir: Option<LwirArchive>,
    pub site: Option<SiteTable>,
    pub sensors: SensorRegistry,
}

impl AuxiliaryTables {
    /// Load every timeseries source named in `paths`
    ///
    /// # Errors
    ///
    /// Returns the first table or I/O error; malformed sources abort the run
    /// before any cube is processed.
    pub fn load(paths: &InputPaths, options: &RunOptions) -> Result<Self> {
        let hydro = paths.tdr.as_deref().map(HydroTable::read).transpose()?;
        let lwir = paths
            .lwir_root
            .as_deref()
            .map(|dir| LwirArchive::read_dir(dir, options.local_offset()?))
            .transpose()?;
        let site = paths.site.as_deref().map(SiteTable::read).transpose()?;

        for (source, present) in [
            (JoinSource::Hydro, hydro.is_some()),
            (JoinSource::Lwir, lwir.is_some()),
            (JoinSource::Site, site.is_some()),
        ] {
            if !present {
                log::info!("no {source} source supplied, its columns stay empty");
            }
        }

        Ok(Self {
            hydro,
            lwir,
            site,
            sensors: SensorRegistry::default(),
        })
    }

    /// Value column names of the site table, empty without one
    #[must_use]
    pub fn site_columns(&self) -> &[String] {
        self.site.as_ref().map(SiteTable::columns).unwrap_or_default()
    }
}

/// Attaches auxiliary readings to zone records
#[derive(Debug, Clone, Copy)]
pub struct AuxiliaryJoiner<'a> {
    tables: &'a AuxiliaryTables,
    context: &'a DatasetContext,
    max_delta: Duration,
}

impl<'a> AuxiliaryJoiner<'a> {
    pub fn new(tables: &'a AuxiliaryTables, context: &'a DatasetContext, max_delta: Duration) -> Self {
        Self {
            tables,
            context,
            max_delta,
        }
    }

    /// Join all sources for one zone of one cube
    #[must_use]
    pub fn join(&self, id: &DatapointId, zone: ZoneId, time: DateTime<Utc>) -> JoinedFields {
        let mut joined = JoinedFields::default();

        let hydro = match &self.tables.hydro {
            Some(table) => {
                hydro::join_hydro(table, &self.tables.sensors, zone, time, self.max_delta)
            }
            None => Err(GapReason::NoTable),
        };
        match hydro {
            Ok(reading) => joined.hydro = Some(reading),
            Err(reason) => joined.gaps.push(JoinGap {
                source: JoinSource::Hydro,
                reason,
            }),
        }

        match self.join_lwir(&id.measurement, zone, time) {
            Ok(summary) => joined.lwir = Some(summary),
            Err(reason) => joined.gaps.push(JoinGap {
                source: JoinSource::Lwir,
                reason,
            }),
        }

        let site = match &self.tables.site {
            Some(table) => site::join_site(table, &id.measurement, time, self.max_delta),
            None => Err(GapReason::NoTable),
        };
        match site {
            Ok(reading) => joined.site = Some(reading),
            Err(reason) => joined.gaps.push(JoinGap {
                source: JoinSource::Site,
                reason,
            }),
        }

        joined
    }

    fn join_lwir(
        &self,
        measurement: &str,
        zone: ZoneId,
        time: DateTime<Utc>,
    ) -> std::result::Result<LwirSummary, GapReason> {
        let archive = self.tables.lwir.as_ref().ok_or(GapReason::NoTable)?;
        let bounds = self
            .context
            .zones_for(measurement, SensorType::Lwir)
            .and_then(|definition| definition.zones.get(&zone))
            .ok_or(GapReason::NoDefinition)?;
        let frame = archive.nearest(time, self.max_delta)?;
        lwir::summarize_frame(frame, bounds)
    }
}
