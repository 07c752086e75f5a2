//! Zone reductions over the band axis
//!
//! A valid zone is gathered into a (pixel, band) matrix and reduced band by
//! band. Bands are reduced in parallel with rayon; cubes are already spread
//! over the worker pool, so this only pays off for large zones.

use super::operations::SummaryStatistic;
use crate::cube::Cube;
use crate::errors::{HydError, Result};
use crate::zones::{ZoneSlice, ZoneValidity};
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

/// Above this many pixels the band reductions run in parallel
const PARALLEL_PIXEL_THRESHOLD: usize = 4096;

/// Gather the included pixels of a zone as a (pixel, band) matrix
#[must_use]
pub fn zone_spectra(cube: &Cube, slice: &ZoneSlice) -> Array2<f32> {
    let bands = cube.band_count();
    Array2::from_shape_fn((slice.pixels.len(), bands), |(i, band)| {
        let (row, col) = slice.pixels[i];
        cube.data[[row, col, band]]
    })
}

/// Reduce a (pixel, band) matrix to one value per band
///
/// A single pixel is returned unchanged whatever the statistic.
#[must_use]
pub fn reduce_bands(spectra: ArrayView2<'_, f32>, statistic: SummaryStatistic) -> Vec<f64> {
    if spectra.nrows() == 1 {
        return spectra.row(0).iter().map(|&v| f64::from(v)).collect();
    }

    let reduce = |band: ndarray::ArrayView1<'_, f32>| {
        let values: Vec<f64> = band.iter().map(|&v| f64::from(v)).collect();
        statistic.apply(&values)
    };

    if spectra.nrows() >= PARALLEL_PIXEL_THRESHOLD {
        spectra
            .axis_iter(Axis(1))
            .into_par_iter()
            .map(reduce)
            .collect()
    } else {
        spectra.axis_iter(Axis(1)).map(reduce).collect()
    }
}

/// Feature vector of a valid zone
///
/// With `good_bands` set, only bands flagged `true` are kept.
///
/// # Errors
///
/// Returns [`HydError::Coverage`] if the slice is not valid or has no pixels.
pub fn summarize_zone(
    cube: &Cube,
    slice: &ZoneSlice,
    statistic: SummaryStatistic,
    good_bands: Option<&[bool]>,
) -> Result<Vec<f64>> {
    if slice.validity != ZoneValidity::Valid || slice.pixels.is_empty() {
        let required = match slice.validity {
            ZoneValidity::InsufficientCoverage { required, .. } => required,
            _ => 1,
        };
        return Err(HydError::Coverage {
            zone: slice.zone.to_string(),
            pixels: slice.pixels.len(),
            required,
        });
    }

    let features = reduce_bands(zone_spectra(cube, slice).view(), statistic);
    Ok(match good_bands {
        Some(flags) => features
            .into_iter()
            .zip(flags)
            .filter_map(|(value, &good)| good.then_some(value))
            .collect(),
        None => features,
    })
}
