//! Exclusion masks for obstructions in the field of view
//!
//! Every measurement may carry a [`MaskDefinition`]: a crop rectangle and up
//! to four wooden bars lying across the plots. The mask engine turns it into
//! a boolean map over (row, column) in which `true` marks an excluded pixel.
//!
//! Coordinates follow the mask tables: a bar endpoint is `(x, y)` with `x`
//! the row and `y` the column, and a bar's height extends it along the rows.

use ndarray::Array2;
use std::str::FromStr;

/// Half-open rectangle `row_start..row_end` × `col_start..col_end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Bounds {
    #[must_use]
    pub const fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// The whole image
    #[must_use]
    pub const fn full(rows: usize, columns: usize) -> Self {
        Self::new(0, rows, 0, columns)
    }

    /// Intersection with an image of the given extent
    #[must_use]
    pub fn clip(&self, rows: usize, columns: usize) -> Self {
        let row_end = self.row_end.min(rows);
        let col_end = self.col_end.min(columns);
        Self::new(
            self.row_start.min(row_end),
            row_end,
            self.col_start.min(col_end),
            col_end,
        )
    }

    #[must_use]
    pub fn area(&self) -> usize {
        self.row_end.saturating_sub(self.row_start) * self.col_end.saturating_sub(self.col_start)
    }

    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..self.row_end).contains(&row) && (self.col_start..self.col_end).contains(&col)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.row_start < other.row_end
            && other.row_start < self.row_end
            && self.col_start < other.col_end
            && other.col_start < self.col_end
    }
}

/// A wooden bar given by two endpoints `(row, col)` and a height in rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub p1: (f64, f64),
    pub p2: (f64, f64),
    pub height: f64,
}

/// Rasterisation rule for bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarModel {
    /// Parallelogram `p1, p2, p2 + (h, 0), p1 + (h, 0)`, rows `top ≤ r < top + h`
    #[default]
    Quadrilateral,
    /// Strict band between the lines `col = m·row + c` through the top and
    /// bottom edges; reproduces masks of earlier processing runs
    LineBand,
}

impl FromStr for BarModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quadrilateral" | "quad" => Ok(Self::Quadrilateral),
            "line-band" | "lineband" => Ok(Self::LineBand),
            other => Err(format!(
                "unknown bar model '{other}', expected 'quadrilateral' or 'line-band'"
            )),
        }
    }
}

/// A region that can be burnt into an exclusion map
pub trait ExclusionShape {
    /// `true` if the pixel at (row, col) lies inside the region
    fn excludes(&self, row: usize, col: usize) -> bool;

    /// Mark every covered pixel of `map`; earlier marks are kept
    fn rasterize(&self, map: &mut Array2<bool>) {
        for ((row, col), excluded) in map.indexed_iter_mut() {
            if !*excluded && self.excludes(row, col) {
                *excluded = true;
            }
        }
    }
}

/// Bar rasterised as a parallelogram
#[derive(Debug, Clone, Copy)]
pub struct Quadrilateral(pub Bar);

impl ExclusionShape for Quadrilateral {
    fn excludes(&self, row: usize, col: usize) -> bool {
        let Bar { p1, p2, height } = self.0;
        let (r1, c1) = p1;
        let (r2, c2) = p2;
        let (r, c) = (row as f64, col as f64);

        let (top, within_columns) = if c1 == c2 {
            // fractional column coordinates snap to the nearest pixel column
            (r1.min(r2), c == c1.round())
        } else {
            let top = r1 + (r2 - r1) * (c - c1) / (c2 - c1);
            (top, c >= c1.min(c2) && c <= c1.max(c2))
        };
        if !within_columns {
            return false;
        }

        let bottom = if c1 == c2 { r1.max(r2) + height } else { top + height };
        let (low, high) = if bottom < top { (bottom, top) } else { (top, bottom) };
        r >= low && r < high
    }
}

/// Bar rasterised with the strict line-band rule
#[derive(Debug, Clone, Copy)]
pub struct LineBand(pub Bar);

/// Slope and intercept of `y = m·x + c` through two points
#[must_use]
pub fn line_from_points(p1: (f64, f64), p2: (f64, f64)) -> (f64, f64) {
    let m = (p2.1 - p1.1) / (p2.0 - p1.0);
    let c = p2.1 - m * p2.0;
    (m, c)
}

impl ExclusionShape for LineBand {
    fn excludes(&self, row: usize, col: usize) -> bool {
        let Bar { p1, p2, height } = self.0;
        let (m1, c1) = line_from_points(p1, p2);
        let (m2, c2) = line_from_points((p1.0 + height, p1.1), (p2.0 + height, p2.1));
        let (x, y) = (row as f64, col as f64);
        m2 * x + c2 < y && y < m1 * x + c1
    }
}

/// Crop rectangle and bars of one measurement
#[derive(Debug, Clone, PartialEq)]
pub struct MaskDefinition {
    pub crop: Bounds,
    pub bars: Vec<Bar>,
}

/// Build the exclusion map for an image of `shape` (rows, columns)
///
/// Pixels outside the crop rectangle are always excluded; bars are OR-ed in
/// one after another. Without a definition only the (full-extent) crop
/// applies, so nothing is excluded.
#[must_use]
pub fn exclusion_map(
    shape: (usize, usize),
    definition: Option<&MaskDefinition>,
    model: BarModel,
) -> Array2<bool> {
    let (rows, columns) = shape;
    let crop = definition
        .map(|d| d.crop)
        .unwrap_or_else(|| Bounds::full(rows, columns));

    let mut map = Array2::from_shape_fn(shape, |(row, col)| !crop.contains(row, col));

    for bar in definition.map(|d| d.bars.as_slice()).unwrap_or_default() {
        match model {
            BarModel::Quadrilateral => Quadrilateral(*bar).rasterize(&mut map),
            BarModel::LineBand => LineBand(*bar).rasterize(&mut map),
        }
    }

    map
}

/// Pixels a bar covers in an image of `shape`, in row-major order
#[must_use]
pub fn bar_pixels(bar: Bar, shape: (usize, usize), model: BarModel) -> Vec<(usize, usize)> {
    let (rows, columns) = shape;
    let shape: Box<dyn ExclusionShape> = match model {
        BarModel::Quadrilateral => Box::new(Quadrilateral(bar)),
        BarModel::LineBand => Box::new(LineBand(bar)),
    };
    (0..rows)
        .flat_map(|row| (0..columns).map(move |col| (row, col)))
        .filter(|&(row, col)| shape.excludes(row, col))
        .collect()
}
