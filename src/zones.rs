//! Measurement zones and zone partitioning
//!
//! Each measurement has eight fixed rectangular zones (`zone1` .. `zone8`),
//! one per soil plot, defined once for the hyperspectral camera and once for
//! the LWIR camera. The partitioner cuts a cube into one [`ZoneSlice`] per
//! zone, drops excluded pixels and decides whether the zone is usable.

use crate::context::IgnoreRules;
use crate::cube::DatapointId;
use crate::mask::Bounds;
use crate::options::RunOptions;
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Zone identifier, displayed as `zone<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone{}", self.0)
    }
}

impl serde::Serialize for ZoneId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for ZoneId {
    type Err = String;

    /// Accepts `zone3` as well as a bare `3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("zone").unwrap_or(s.trim());
        digits
            .parse()
            .map(ZoneId)
            .map_err(|_| format!("invalid zone identifier '{s}'"))
    }
}

/// Camera whose pixel grid a zone table refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Hyperspectral,
    Lwir,
}

/// Zone rectangles of one measurement for one camera
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneDefinition {
    pub zones: BTreeMap<ZoneId, Bounds>,
    /// White reference patch; its pixels never count towards a zone
    pub spectralon: Option<Bounds>,
}

impl ZoneDefinition {
    /// Zones whose rectangle overlaps the spectralon
    #[must_use]
    pub fn spectralon_overlaps(&self) -> Vec<ZoneId> {
        match &self.spectralon {
            Some(spectralon) => self
                .zones
                .iter()
                .filter(|(_, bounds)| bounds.overlaps(spectralon))
                .map(|(zone, _)| *zone)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Which ignore rule removed a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreLevel {
    Measurement,
    Datapoint,
    Zone,
}

/// Whether a zone reaches the summariser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneValidity {
    Valid,
    Ignored(IgnoreLevel),
    InsufficientCoverage { pixels: usize, required: usize },
}

/// Included pixels of one zone of one cube
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSlice {
    pub zone: ZoneId,
    /// Zone rectangle clipped to the image
    pub bounds: Bounds,
    /// Included `(row, col)` pixels in row-major order
    pub pixels: Vec<(usize, usize)>,
    pub validity: ZoneValidity,
}

impl ZoneSlice {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity == ZoneValidity::Valid
    }
}

/// Cuts cubes into zone slices under a set of ignore rules
#[derive(Debug, Clone, Copy)]
pub struct ZonePartitioner<'a> {
    rules: &'a IgnoreRules,
    options: &'a RunOptions,
}

impl<'a> ZonePartitioner<'a> {
    pub fn new(rules: &'a IgnoreRules, options: &'a RunOptions) -> Self {
        Self { rules, options }
    }

    /// One slice per zone of `definition`, in zone order
    ///
    /// Zones are clipped to the extent of `exclusion`. Ignored zones carry no
    /// pixels.
    #[must_use]
    pub fn partition(
        &self,
        id: &DatapointId,
        exclusion: &Array2<bool>,
        definition: &ZoneDefinition,
    ) -> Vec<ZoneSlice> {
        let (rows, columns) = exclusion.dim();

        definition
            .zones
            .iter()
            .map(|(&zone, bounds)| {
                let bounds = bounds.clip(rows, columns);
                if let Some(level) = self.rules.ignore_level(id, zone) {
                    return ZoneSlice {
                        zone,
                        bounds,
                        pixels: Vec::new(),
                        validity: ZoneValidity::Ignored(level),
                    };
                }

                let pixels: Vec<(usize, usize)> = (bounds.row_start..bounds.row_end)
                    .flat_map(|row| (bounds.col_start..bounds.col_end).map(move |col| (row, col)))
                    .filter(|&(row, col)| !exclusion[[row, col]])
                    .filter(|&(row, col)| {
                        !definition
                            .spectralon
                            .is_some_and(|spectralon| spectralon.contains(row, col))
                    })
                    .collect();

                let required = self.options.required_pixels(bounds.area());
                let validity = if pixels.len() < required {
                    ZoneValidity::InsufficientCoverage {
                        pixels: pixels.len(),
                        required,
                    }
                } else {
                    ZoneValidity::Valid
                };

                ZoneSlice {
                    zone,
                    bounds,
                    pixels,
                    validity,
                }
            })
            .collect()
    }
}
