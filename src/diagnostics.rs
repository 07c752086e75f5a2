//! Diagnostics log
//!
//! Every file or zone left out of the dataset, every fallback to a default
//! definition and every unjoined auxiliary field gets one entry here. The log
//! is produced together with the dataset and can be written as JSON.

use crate::cube::DatapointId;
use crate::errors::Result;
use crate::join::JoinSource;
use crate::zones::ZoneId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

/// Reason code of a diagnostic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    IgnoredMeasurement,
    IgnoredDatapoint,
    IgnoredZone,
    DuplicateDatapoint,
    MalformedCube,
    UnreadableCube,
    EmptyCube,
    MissingMaskDefinition,
    MissingZoneDefinition,
    InsufficientCoverage,
    BandMismatch,
    JoinGap,
}

impl DiagnosticCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IgnoredMeasurement => "ignored_measurement",
            Self::IgnoredDatapoint => "ignored_datapoint",
            Self::IgnoredZone => "ignored_zone",
            Self::DuplicateDatapoint => "duplicate_datapoint",
            Self::MalformedCube => "malformed_cube",
            Self::UnreadableCube => "unreadable_cube",
            Self::EmptyCube => "empty_cube",
            Self::MissingMaskDefinition => "missing_mask_definition",
            Self::MissingZoneDefinition => "missing_zone_definition",
            Self::InsufficientCoverage => "insufficient_coverage",
            Self::BandMismatch => "band_mismatch",
            Self::JoinGap => "join_gap",
        }
    }

    /// `true` for codes that remove a file or zone from the dataset
    #[must_use]
    pub const fn is_skip(self) -> bool {
        !matches!(self, Self::MissingMaskDefinition | Self::JoinGap)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub measurement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneId>,
    pub code: DiagnosticCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<JoinSource>,
    pub message: String,
}

impl Diagnostic {
    /// Entry about a whole datapoint
    pub fn file(id: &DatapointId, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            measurement: id.measurement.clone(),
            file_number: Some(id.file_number),
            zone: None,
            code,
            source: None,
            message: message.into(),
        }
    }

    /// Entry about one zone of a datapoint
    pub fn zone(
        id: &DatapointId,
        zone: ZoneId,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            zone: Some(zone),
            ..Self::file(id, code, message)
        }
    }

    /// Entry about an auxiliary field left empty
    pub fn join_gap(
        id: &DatapointId,
        zone: ZoneId,
        source: JoinSource,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(source),
            ..Self::zone(id, zone, DiagnosticCode::JoinGap, message)
        }
    }

    fn sort_key(&self) -> (&str, Option<u32>, Option<ZoneId>, DiagnosticCode, Option<JoinSource>) {
        (
            &self.measurement,
            self.file_number,
            self.zone,
            self.code,
            self.source,
        )
    }
}

/// All diagnostics of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticsLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticsLog {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(diagnostics);
    }

    /// Order entries by measurement, file, zone and code
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries carrying `code`
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.code == code)
    }

    /// Number of entries per code
    #[must_use]
    pub fn counts(&self) -> BTreeMap<DiagnosticCode, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.code).or_insert(0) += 1;
        }
        counts
    }

    /// Write the log as a pretty-printed JSON array
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::HydError::Json`] if writing fails.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
