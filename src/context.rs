//! Immutable per-run context
//!
//! Mask definitions, zone definitions for both cameras and the ignore rules
//! are loaded once and passed by reference through the pipeline.

use crate::cube::DatapointId;
use crate::errors::Result;
use crate::mask::MaskDefinition;
use crate::options::InputPaths;
use crate::tables::{ignore, masks, positions};
use crate::zones::{IgnoreLevel, SensorType, ZoneDefinition, ZoneId};
use std::collections::{BTreeSet, HashMap};

/// Measurements, datapoints and zones excluded from the output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    measurements: BTreeSet<String>,
    datapoints: BTreeSet<(String, u32)>,
    zones: BTreeSet<(String, u32, ZoneId)>,
}

impl IgnoreRules {
    pub fn ignore_measurement(&mut self, measurement: &str) {
        self.measurements.insert(measurement.to_string());
    }

    pub fn ignore_datapoint(&mut self, measurement: &str, file_number: u32) {
        self.datapoints
            .insert((measurement.to_string(), file_number));
    }

    pub fn ignore_zone(&mut self, measurement: &str, file_number: u32, zone: ZoneId) {
        self.zones
            .insert((measurement.to_string(), file_number, zone));
    }

    #[must_use]
    pub fn is_measurement_ignored(&self, measurement: &str) -> bool {
        self.measurements.contains(measurement)
    }

    /// Coarsest rule that removes a whole datapoint
    #[must_use]
    pub fn datapoint_level(&self, id: &DatapointId) -> Option<IgnoreLevel> {
        if self.is_measurement_ignored(&id.measurement) {
            Some(IgnoreLevel::Measurement)
        } else if self
            .datapoints
            .contains(&(id.measurement.clone(), id.file_number))
        {
            Some(IgnoreLevel::Datapoint)
        } else {
            None
        }
    }

    /// Coarsest rule that removes a zone of a datapoint
    #[must_use]
    pub fn ignore_level(&self, id: &DatapointId, zone: ZoneId) -> Option<IgnoreLevel> {
        self.datapoint_level(id).or_else(|| {
            self.zones
                .contains(&(id.measurement.clone(), id.file_number, zone))
                .then_some(IgnoreLevel::Zone)
        })
    }
}

/// Definitions shared by every file of a run
#[derive(Debug, Clone, Default)]
pub struct DatasetContext {
    pub masks: HashMap<String, MaskDefinition>,
    pub zones_hyp: HashMap<String, ZoneDefinition>,
    pub zones_lwir: HashMap<String, ZoneDefinition>,
    pub ignore: IgnoreRules,
}

impl DatasetContext {
    /// Load the definition and ignore tables named in `paths`
    ///
    /// # Errors
    ///
    /// Returns the first table or I/O error.
    pub fn load(paths: &InputPaths) -> Result<Self> {
        let masks = match &paths.masks {
            Some(path) => masks::read_masks(path)?,
            None => HashMap::new(),
        };
        let zones_hyp = match &paths.positions_hyp {
            Some(path) => positions::read_positions(path)?,
            None => HashMap::new(),
        };
        let zones_lwir = match &paths.positions_lwir {
            Some(path) => positions::read_positions(path)?,
            None => HashMap::new(),
        };
        let ignore = ignore::read_ignore_rules(
            paths.ignore_measurements.as_deref(),
            paths.ignore_datapoints.as_deref(),
            paths.ignore_zones.as_deref(),
        )?;

        log::info!(
            "context: {} masks, {} hyperspectral and {} LWIR zone definitions",
            masks.len(),
            zones_hyp.len(),
            zones_lwir.len()
        );

        Ok(Self {
            masks,
            zones_hyp,
            zones_lwir,
            ignore,
        })
    }

    #[must_use]
    pub fn mask_for(&self, measurement: &str) -> Option<&MaskDefinition> {
        self.masks.get(measurement)
    }

    /// Zone definition for a measurement and camera
    ///
    /// LWIR tables may be keyed by the measurement's date prefix alone.
    #[must_use]
    pub fn zones_for(&self, measurement: &str, sensor: SensorType) -> Option<&ZoneDefinition> {
        match sensor {
            SensorType::Hyperspectral => self.zones_hyp.get(measurement),
            SensorType::Lwir => self.zones_lwir.get(measurement).or_else(|| {
                measurement
                    .split('_')
                    .next()
                    .and_then(|date| self.zones_lwir.get(date))
            }),
        }
    }
}
