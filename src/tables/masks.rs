//! Mask table: one crop rectangle and up to four bars per measurement
//!
//! ```text
//! measurement    start_row end_row start_col end_col bar1_p1_x bar1_p1_y bar1_p2_x bar1_p2_y bar1_height ...
//! 20170815_meas1 2         48      0         50      5         5         10        6         2           ...
//! ```

use super::{parse_index, parse_optional_f64, Table};
use crate::errors::Result;
use crate::mask::{Bar, Bounds, MaskDefinition};
use std::collections::HashMap;
use std::path::Path;

/// Number of bar column groups a mask table may carry
pub const MAX_BARS: usize = 4;

/// Read a mask table into definitions keyed by measurement
///
/// A bar is absent when any of its columns is missing or empty, or its
/// height is zero.
///
/// # Errors
///
/// Returns [`crate::errors::HydError::Table`] for missing crop columns or
/// unparseable crop bounds.
pub fn read_masks(path: &Path) -> Result<HashMap<String, MaskDefinition>> {
    masks_from_table(&Table::read(path)?)
}

pub fn masks_from_table(table: &Table) -> Result<HashMap<String, MaskDefinition>> {
    let measurement = table.require_column("measurement")?;
    let crop_columns = [
        table.require_column("start_row")?,
        table.require_column("end_row")?,
        table.require_column("start_col")?,
        table.require_column("end_col")?,
    ];

    let bar_columns: Vec<Option<[usize; 5]>> = (1..=MAX_BARS)
        .map(|i| {
            let names = [
                format!("bar{i}_p1_x"),
                format!("bar{i}_p1_y"),
                format!("bar{i}_p2_x"),
                format!("bar{i}_p2_y"),
                format!("bar{i}_height"),
            ];
            let found: Vec<usize> = names.iter().filter_map(|n| table.column(n)).collect();
            <[usize; 5]>::try_from(found).ok()
        })
        .collect();

    let mut definitions = HashMap::new();
    for (row_no, row) in table.rows.iter().enumerate() {
        let mut crop = [0usize; 4];
        for (slot, &column) in crop.iter_mut().zip(&crop_columns) {
            *slot = parse_index(&row[column])
                .ok_or_else(|| table.cell_error(row_no, column, "a non-negative integer"))?;
        }
        let [row_start, row_end, col_start, col_end] = crop;

        let bars = bar_columns
            .iter()
            .flatten()
            .filter_map(|columns| {
                let values: Vec<f64> = columns
                    .iter()
                    .map(|&c| parse_optional_f64(&row[c]))
                    .collect::<Option<Vec<_>>>()?;
                let bar = Bar {
                    p1: (values[0], values[1]),
                    p2: (values[2], values[3]),
                    height: values[4],
                };
                (bar.height != 0.0).then_some(bar)
            })
            .collect();

        definitions.insert(
            row[measurement].clone(),
            MaskDefinition {
                crop: Bounds::new(row_start, row_end, col_start, col_end),
                bars,
            },
        );
    }

    log::debug!(
        "read {} mask definitions from {}",
        definitions.len(),
        table.path.display()
    );
    Ok(definitions)
}
