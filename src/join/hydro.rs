//! Soil moisture from the TDR loggers
//!
//! Every plot carries one or more TDR sensors at different depths. A zone is
//! matched with the uppermost sensor of its plot, and the sensor's reading
//! closest in time to the cube is attached to the zone.

use super::GapReason;
use crate::errors::Result;
use crate::tables::{parse_optional_f64, parse_timestamp, timeseries::Nearest, Table, Timeseries};
use crate::zones::ZoneId;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One TDR sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SoilSensor {
    pub number: u32,
    /// Plot label, `A1` .. `D2`
    pub plot: String,
    /// Depth below surface in centimetres
    pub depth_cm: f64,
}

impl SoilSensor {
    fn new(number: u32, plot: &str, depth_cm: f64) -> Self {
        Self {
            number,
            plot: plot.to_string(),
            depth_cm,
        }
    }

    /// Descriptive name such as `SM_36554_A1_2.5`
    #[must_use]
    pub fn name(&self) -> String {
        format!("SM_{}_{}_{:?}", self.number, self.plot, self.depth_cm)
    }

    /// Value of the logger's `sensorID` column for this sensor
    #[must_use]
    pub fn logger_id(&self) -> String {
        format!("T{}", self.number)
    }
}

/// Zone a plot label belongs to: `A1 → zone1`, `A2 → zone2`, ..., `D2 → zone8`
#[must_use]
pub fn plot_zone(plot: &str) -> Option<ZoneId> {
    let mut chars = plot.chars();
    let row = chars.next()?.to_ascii_uppercase();
    let half: u32 = chars.as_str().parse().ok()?;
    if !('A'..='D').contains(&row) || !(1..=2).contains(&half) {
        return None;
    }
    Some(ZoneId((row as u32 - 'A' as u32) * 2 + half))
}

/// The sensors installed in the field
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRegistry {
    sensors: Vec<SoilSensor>,
    /// Index into `sensors` of the shallowest sensor of each plot
    uppermost: BTreeMap<ZoneId, usize>,
}

impl Default for SensorRegistry {
    /// The eighteen sensors of the experiment
    fn default() -> Self {
        let layout: [(u32, &str, f64); 18] = [
            (36554, "A1", 2.5),
            (36555, "A1", 5.0),
            (36556, "A1", 10.0),
            (36547, "A2", 5.0),
            (36557, "B1", 2.5),
            (36558, "B1", 5.0),
            (36559, "B1", 10.0),
            (36553, "B2", 5.0),
            (36549, "C1", 2.5),
            (36550, "C1", 5.0),
            (36551, "C1", 10.0),
            (36552, "C1", 20.0),
            (36560, "C2", 5.0),
            (36562, "D1", 2.5),
            (36563, "D1", 5.0),
            (36564, "D1", 10.0),
            (36565, "D1", 20.0),
            (36561, "D2", 5.0),
        ];
        Self::new(
            layout
                .iter()
                .map(|&(number, plot, depth)| SoilSensor::new(number, plot, depth))
                .collect(),
        )
    }
}

impl SensorRegistry {
    pub fn new(sensors: Vec<SoilSensor>) -> Self {
        let mut uppermost: BTreeMap<ZoneId, usize> = BTreeMap::new();
        for (index, sensor) in sensors.iter().enumerate() {
            let Some(zone) = plot_zone(&sensor.plot) else {
                continue;
            };
            uppermost
                .entry(zone)
                .and_modify(|current| {
                    if sensor.depth_cm < sensors[*current].depth_cm {
                        *current = index;
                    }
                })
                .or_insert(index);
        }
        Self { sensors, uppermost }
    }

    #[must_use]
    pub fn sensors(&self) -> &[SoilSensor] {
        &self.sensors
    }

    /// The shallowest sensor of every plot, ordered by zone
    #[must_use]
    pub fn uppermost(&self) -> Vec<(ZoneId, &SoilSensor)> {
        self.uppermost
            .iter()
            .map(|(&zone, &index)| (zone, &self.sensors[index]))
            .collect()
    }

    /// Shallowest sensor of the plot a zone covers
    #[must_use]
    pub fn uppermost_for(&self, zone: ZoneId) -> Option<&SoilSensor> {
        self.uppermost.get(&zone).map(|&index| &self.sensors[index])
    }
}

/// Soil moisture reading attached to a zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydroReading {
    pub sensor: u32,
    pub time: DateTime<Utc>,
    /// Volumetric soil moisture in vol-%
    pub soil_moisture: f64,
    /// Soil temperature in °C
    pub soil_temperature: f64,
}

/// TDR readings grouped by logger sensor id
#[derive(Debug, Clone, Default)]
pub struct HydroTable {
    by_sensor: HashMap<String, Timeseries>,
}

pub const MOISTURE_COLUMN: &str = "volSM_vol%";
pub const TEMPERATURE_COLUMN: &str = "T_C";

impl HydroTable {
    /// Read a TDR export with `timestamp`, `sensorID`, `volSM_vol%` and `T_C`
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::HydError::Table`] for missing columns or
    /// timestamps that do not parse.
    pub fn read(path: &Path) -> Result<Self> {
        Self::from_table(&Table::read(path)?)
    }

    pub fn from_table(table: &Table) -> Result<Self> {
        let timestamp = table.require_column("timestamp")?;
        let sensor = table.require_column("sensorID")?;
        let moisture = table.require_column(MOISTURE_COLUMN)?;
        let temperature = table.require_column(TEMPERATURE_COLUMN)?;

        let mut rows: HashMap<String, Vec<(DateTime<Utc>, Vec<f64>)>> = HashMap::new();
        for (row_no, row) in table.rows.iter().enumerate() {
            let time = parse_timestamp(&row[timestamp])
                .ok_or_else(|| table.cell_error(row_no, timestamp, "a timestamp"))?;
            let values = vec![
                parse_optional_f64(&row[moisture]).unwrap_or(f64::NAN),
                parse_optional_f64(&row[temperature]).unwrap_or(f64::NAN),
            ];
            rows.entry(row[sensor].clone()).or_default().push((time, values));
        }

        let columns = vec![MOISTURE_COLUMN.to_string(), TEMPERATURE_COLUMN.to_string()];
        let by_sensor = rows
            .into_iter()
            .map(|(id, rows)| (id, Timeseries::from_rows(columns.clone(), rows)))
            .collect();
        Ok(Self { by_sensor })
    }

    /// Series of one logger sensor id
    #[must_use]
    pub fn series(&self, logger_id: &str) -> Option<&Timeseries> {
        self.by_sensor.get(logger_id)
    }
}

/// Reading of the zone's uppermost sensor closest to `time`
///
/// # Errors
///
/// Returns the reason no reading could be attached.
pub fn join_hydro(
    table: &HydroTable,
    registry: &SensorRegistry,
    zone: ZoneId,
    time: DateTime<Utc>,
    max_delta: Duration,
) -> std::result::Result<HydroReading, GapReason> {
    let sensor = registry.uppermost_for(zone).ok_or(GapReason::NoSeries)?;
    let series = table
        .series(&sensor.logger_id())
        .ok_or(GapReason::NoSeries)?;

    match series.nearest(time, max_delta) {
        Nearest::Found { time, values } => Ok(HydroReading {
            sensor: sensor.number,
            time,
            soil_moisture: values[0],
            soil_temperature: values[1],
        }),
        Nearest::TooFar { delta } => Err(GapReason::TooFar { delta }),
        Nearest::Empty => Err(GapReason::NoSeries),
    }
}
