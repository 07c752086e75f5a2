//! Zone position tables
//!
//! Every zone contributes four columns, `<zone>_row_start`, `<zone>_row_end`,
//! `<zone>_col_start` and `<zone>_col_end`; `spec_*` columns locate the
//! spectralon. Bounds are half-open.

use super::{parse_index, Table};
use crate::errors::Result;
use crate::mask::Bounds;
use crate::zones::{ZoneDefinition, ZoneId};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

const SPECTRALON_PREFIX: &str = "spec";

/// Read a position table into zone definitions keyed by measurement
///
/// # Errors
///
/// Returns [`crate::errors::HydError::Table`] for a missing `measurement`
/// column or a zone with an incomplete set of columns.
pub fn read_positions(path: &Path) -> Result<HashMap<String, ZoneDefinition>> {
    positions_from_table(&Table::read(path)?)
}

pub fn positions_from_table(table: &Table) -> Result<HashMap<String, ZoneDefinition>> {
    let measurement = table.require_column("measurement")?;
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^(zone\d+|spec)_row_start$").expect("valid regex"));

    let mut prefixes: Vec<(String, [usize; 4])> = Vec::new();
    for header in &table.headers {
        let Some(captures) = pattern.captures(header) else {
            continue;
        };
        let prefix = captures[1].to_string();
        let columns = [
            table.require_column(&format!("{prefix}_row_start"))?,
            table.require_column(&format!("{prefix}_row_end"))?,
            table.require_column(&format!("{prefix}_col_start"))?,
            table.require_column(&format!("{prefix}_col_end"))?,
        ];
        prefixes.push((prefix, columns));
    }

    let mut definitions = HashMap::new();
    for (row_no, row) in table.rows.iter().enumerate() {
        let mut zones = BTreeMap::new();
        let mut spectralon = None;

        for (prefix, columns) in &prefixes {
            // a zone left empty for this measurement is simply not defined
            if columns.iter().all(|&c| super::parse_optional_f64(&row[c]).is_none()) {
                continue;
            }
            let mut edges = [0usize; 4];
            for (slot, &column) in edges.iter_mut().zip(columns) {
                *slot = parse_index(&row[column])
                    .ok_or_else(|| table.cell_error(row_no, column, "a non-negative integer"))?;
            }
            let bounds = Bounds::new(edges[0], edges[1], edges[2], edges[3]);

            if prefix == SPECTRALON_PREFIX {
                spectralon = Some(bounds);
            } else {
                let zone: ZoneId = prefix
                    .parse()
                    .map_err(|message: String| crate::errors::HydError::table(&table.path, message))?;
                zones.insert(zone, bounds);
            }
        }

        let definition = ZoneDefinition { zones, spectralon };
        let overlapping = definition.spectralon_overlaps();
        if !overlapping.is_empty() {
            log::warn!(
                "{}: zones {:?} overlap the spectralon, its pixels are left out of them",
                row[measurement],
                overlapping.iter().map(ToString::to_string).collect::<Vec<_>>()
            );
        }
        definitions.insert(row[measurement].clone(), definition);
    }

    Ok(definitions)
}
