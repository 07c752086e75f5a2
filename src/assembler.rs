//! Dataset assembly over all measurement folders
//!
//! The assembler enumerates every cube under the hyperspectral root, runs the
//! per-file pipeline on the rayon pool and merges the results. A file that
//! fails only costs its own records; the reason ends up in the diagnostics.
//!
//! Per file the pipeline is:
//!
//! 1. ignore rules for the measurement and datapoint
//! 2. [`CubeReader::read`] and the blank-image check
//! 3. [`exclusion_map`] from the measurement's mask definition
//! 4. [`ZonePartitioner::partition`] over the hyperspectral zone definition
//! 5. [`summarize_zone`] for every valid zone
//! 6. [`AuxiliaryJoiner::join`] for every summarised zone

use crate::context::DatasetContext;
use crate::cube::{file_number, measurement_name, Cube, CubeReader, DatapointId};
use crate::dataset::{Dataset, ZoneRecord};
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticsLog};
use crate::errors::{HydError, Result};
use crate::join::{AuxiliaryJoiner, AuxiliaryTables, GapReason};
use crate::mask::exclusion_map;
use crate::options::RunOptions;
use crate::statistics::summarize_zone;
use crate::zones::{IgnoreLevel, SensorType, ZonePartitioner, ZoneValidity};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One cube file to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub id: DatapointId,
    pub header_path: PathBuf,
}

/// Cube headers found under a hyperspectral root
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Unique datapoints in key order
    pub tasks: Vec<FileTask>,
    /// Duplicate datapoints that were dropped
    pub diagnostics: Vec<Diagnostic>,
}

/// Enumerate the cube headers of every measurement folder under `hyp_root`
///
/// Headers are `*.hdr` files whose stem ends in a file number; `_highres`
/// companions are not cubes of their own. When two headers map to the same
/// datapoint the first in path order wins.
///
/// # Errors
///
/// Returns [`HydError::Io`] if the root or a measurement folder cannot be
/// listed.
pub fn discover(hyp_root: &Path) -> Result<Discovery> {
    let mut folders: Vec<PathBuf> = std::fs::read_dir(hyp_root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();

    let mut by_id: BTreeMap<DatapointId, PathBuf> = BTreeMap::new();
    let mut discovery = Discovery::default();

    for folder in folders {
        let Some(folder_name) = folder.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let measurement = measurement_name(folder_name);

        let mut headers: Vec<PathBuf> = std::fs::read_dir(&folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "hdr"))
            .collect();
        headers.sort();

        for header_path in headers {
            let Some(stem) = header_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.ends_with("_highres") {
                continue;
            }
            let Some(number) = file_number(stem) else {
                log::debug!("skipping {}: no file number", header_path.display());
                continue;
            };
            let id = DatapointId {
                measurement: measurement.clone(),
                file_number: number,
            };
            if let Some(kept) = by_id.get(&id) {
                discovery.diagnostics.push(Diagnostic::file(
                    &id,
                    DiagnosticCode::DuplicateDatapoint,
                    format!("{} duplicates {}", header_path.display(), kept.display()),
                ));
                continue;
            }
            by_id.insert(id, header_path);
        }
    }

    discovery.tasks = by_id
        .into_iter()
        .map(|(id, header_path)| FileTask { id, header_path })
        .collect();
    Ok(discovery)
}

/// Result of one file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub id: DatapointId,
    /// Wavelengths of the features, set once the cube was read
    pub wavelengths: Option<Vec<f64>>,
    pub records: Vec<ZoneRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Dataset and diagnostics of a run
#[derive(Debug, Clone, Default)]
pub struct AssemblyOutput {
    pub dataset: Dataset,
    pub diagnostics: DiagnosticsLog,
}

/// Runs the pipeline over a set of files
#[derive(Debug)]
pub struct DatasetAssembler<'a> {
    context: &'a DatasetContext,
    tables: &'a AuxiliaryTables,
    options: &'a RunOptions,
    reader: CubeReader,
}

impl<'a> DatasetAssembler<'a> {
    /// # Errors
    ///
    /// Returns [`HydError::Configuration`] for invalid options.
    pub fn new(
        context: &'a DatasetContext,
        tables: &'a AuxiliaryTables,
        options: &'a RunOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            context,
            tables,
            options,
            reader: CubeReader::new(options.local_offset()?),
        })
    }

    /// Process every cube under `hyp_root`
    ///
    /// # Errors
    ///
    /// Returns [`HydError::Io`] only if the folders cannot be listed; per-file
    /// failures become diagnostics.
    pub fn run(&self, hyp_root: &Path) -> Result<AssemblyOutput> {
        let discovery = discover(hyp_root)?;
        log::info!(
            "found {} cubes under {}",
            discovery.tasks.len(),
            hyp_root.display()
        );
        let mut output = self.run_tasks(&discovery.tasks);
        output.diagnostics.extend(discovery.diagnostics);
        output.diagnostics.sort();
        Ok(output)
    }

    /// Process a list of files on the rayon pool and merge the outcomes
    #[must_use]
    pub fn run_tasks(&self, tasks: &[FileTask]) -> AssemblyOutput {
        let mut outcomes: Vec<FileOutcome> = tasks
            .par_iter()
            .map(|task| self.process_file(task))
            .collect();
        outcomes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut output = AssemblyOutput::default();
        output.dataset.site_columns = self.tables.site_columns().to_vec();

        let mut reference: Option<Vec<f64>> = None;
        for outcome in outcomes {
            output.diagnostics.extend(outcome.diagnostics);
            if outcome.records.is_empty() {
                continue;
            }
            let wavelengths = outcome.wavelengths.unwrap_or_default();
            match &reference {
                None => reference = Some(wavelengths),
                Some(expected) if *expected == wavelengths => {}
                Some(expected) => {
                    log::warn!(
                        "{}: {} bands do not match the dataset's {}, dropping",
                        outcome.id,
                        wavelengths.len(),
                        expected.len()
                    );
                    output.diagnostics.push(Diagnostic::file(
                        &outcome.id,
                        DiagnosticCode::BandMismatch,
                        format!("{} bands, dataset has {}", wavelengths.len(), expected.len()),
                    ));
                    continue;
                }
            }
            output.dataset.records.extend(outcome.records);
        }

        output.dataset.wavelengths = reference.unwrap_or_default();
        output.dataset.sort();
        output.diagnostics.sort();

        log::info!(
            "assembled {} zone records, {} diagnostics",
            output.dataset.len(),
            output.diagnostics.len()
        );
        output
    }

    /// Run the whole pipeline for one file
    #[must_use]
    pub fn process_file(&self, task: &FileTask) -> FileOutcome {
        let id = &task.id;
        let mut outcome = FileOutcome {
            id: id.clone(),
            wavelengths: None,
            records: Vec::new(),
            diagnostics: Vec::new(),
        };

        if let Some(level) = self.context.ignore.datapoint_level(id) {
            let (code, message) = match level {
                IgnoreLevel::Measurement => {
                    (DiagnosticCode::IgnoredMeasurement, "measurement is ignored")
                }
                _ => (DiagnosticCode::IgnoredDatapoint, "datapoint is ignored"),
            };
            outcome.diagnostics.push(Diagnostic::file(id, code, message));
            return outcome;
        }

        let cube = match self.reader.read(&task.header_path) {
            Ok(cube) => cube,
            Err(err) => {
                log::warn!("{id}: {err}");
                let code = match err {
                    HydError::Io(_) => DiagnosticCode::UnreadableCube,
                    _ => DiagnosticCode::MalformedCube,
                };
                outcome
                    .diagnostics
                    .push(Diagnostic::file(id, code, err.to_string()));
                return outcome;
            }
        };

        if cube.is_blank() {
            outcome.diagnostics.push(Diagnostic::file(
                id,
                DiagnosticCode::EmptyCube,
                "all values are zero",
            ));
            return outcome;
        }

        outcome.wavelengths = Some(self.feature_wavelengths(&cube));
        self.summarize_cube(&cube, &mut outcome);
        outcome
    }

    fn feature_wavelengths(&self, cube: &Cube) -> Vec<f64> {
        let header = &cube.header;
        if self.options.drop_bad_bands {
            header
                .wavelengths
                .iter()
                .zip(&header.good_bands)
                .filter_map(|(&w, &good)| good.then_some(w))
                .collect()
        } else {
            header.wavelengths.clone()
        }
    }

    fn summarize_cube(&self, cube: &Cube, outcome: &mut FileOutcome) {
        let id = &cube.id;

        let mask = self.context.mask_for(&id.measurement);
        if mask.is_none() {
            outcome.diagnostics.push(Diagnostic::file(
                id,
                DiagnosticCode::MissingMaskDefinition,
                "no mask definition, using the full image",
            ));
        }
        let exclusion = exclusion_map(cube.shape(), mask, self.options.bar_model);

        let Some(zones) = self
            .context
            .zones_for(&id.measurement, SensorType::Hyperspectral)
        else {
            outcome.diagnostics.push(Diagnostic::file(
                id,
                DiagnosticCode::MissingZoneDefinition,
                "no hyperspectral zone definition",
            ));
            return;
        };

        let partitioner = ZonePartitioner::new(&self.context.ignore, self.options);
        let joiner = AuxiliaryJoiner::new(self.tables, self.context, self.options.max_time_delta);
        let good_bands = self
            .options
            .drop_bad_bands
            .then_some(cube.header.good_bands.as_slice());

        for slice in partitioner.partition(id, &exclusion, zones) {
            match slice.validity {
                ZoneValidity::Valid => {}
                ZoneValidity::Ignored(_) => {
                    outcome.diagnostics.push(Diagnostic::zone(
                        id,
                        slice.zone,
                        DiagnosticCode::IgnoredZone,
                        "zone is ignored",
                    ));
                    continue;
                }
                ZoneValidity::InsufficientCoverage { pixels, required } => {
                    outcome.diagnostics.push(Diagnostic::zone(
                        id,
                        slice.zone,
                        DiagnosticCode::InsufficientCoverage,
                        format!("{pixels} usable pixels, {required} required"),
                    ));
                    continue;
                }
            }

            let features = match summarize_zone(cube, &slice, self.options.statistic, good_bands) {
                Ok(features) => features,
                Err(err) => {
                    outcome.diagnostics.push(Diagnostic::zone(
                        id,
                        slice.zone,
                        DiagnosticCode::InsufficientCoverage,
                        err.to_string(),
                    ));
                    continue;
                }
            };

            let joined = joiner.join(id, slice.zone, cube.timestamp);
            // sources absent from the whole run are reported once at load time
            for gap in joined.gaps.iter().filter(|g| g.reason != GapReason::NoTable) {
                outcome.diagnostics.push(Diagnostic::join_gap(
                    id,
                    slice.zone,
                    gap.source,
                    gap.reason.to_string(),
                ));
            }

            outcome.records.push(ZoneRecord {
                id: id.clone(),
                zone: slice.zone,
                timestamp: cube.timestamp,
                features,
                pixel_count: slice.pixels.len(),
                hydro: joined.hydro,
                lwir: joined.lwir,
                site: joined.site,
            });
        }
    }
}
