//! Ignore lists
//!
//! Three tables, all keyed by `measurement`:
//! - ignored measurements: `measurement`
//! - ignored datapoints: `measurement filenumber`
//! - ignored zones: `measurement filenumber zone`

use super::{parse_index, Table};
use crate::context::IgnoreRules;
use crate::errors::Result;
use crate::zones::ZoneId;
use std::path::Path;

/// Build ignore rules from whichever of the three tables are given
///
/// # Errors
///
/// Returns [`crate::errors::HydError::Table`] for missing columns or
/// malformed file numbers and zones.
pub fn read_ignore_rules(
    measurements: Option<&Path>,
    datapoints: Option<&Path>,
    zones: Option<&Path>,
) -> Result<IgnoreRules> {
    let mut rules = IgnoreRules::default();

    if let Some(path) = measurements {
        let table = Table::read(path)?;
        let measurement = table.require_column("measurement")?;
        for row in &table.rows {
            rules.ignore_measurement(&row[measurement]);
        }
    }

    if let Some(path) = datapoints {
        let table = Table::read(path)?;
        let measurement = table.require_column("measurement")?;
        let file_number = table.require_column("filenumber")?;
        for (row_no, row) in table.rows.iter().enumerate() {
            let number = parse_file_number(&table, row_no, file_number)?;
            rules.ignore_datapoint(&row[measurement], number);
        }
    }

    if let Some(path) = zones {
        let table = Table::read(path)?;
        let measurement = table.require_column("measurement")?;
        let file_number = table.require_column("filenumber")?;
        let zone = table.require_column("zone")?;
        for (row_no, row) in table.rows.iter().enumerate() {
            let number = parse_file_number(&table, row_no, file_number)?;
            // zones may be spelled `zone2`, `2` or `2.0`
            let zone_id = row[zone]
                .parse::<ZoneId>()
                .ok()
                .or_else(|| {
                    parse_index(&row[zone])
                        .and_then(|n| u32::try_from(n).ok())
                        .map(ZoneId)
                })
                .ok_or_else(|| table.cell_error(row_no, zone, "a zone number"))?;
            rules.ignore_zone(&row[measurement], number, zone_id);
        }
    }

    Ok(rules)
}

fn parse_file_number(table: &Table, row_no: usize, column: usize) -> Result<u32> {
    parse_index(&table.rows[row_no][column])
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| table.cell_error(row_no, column, "a file number"))
}
