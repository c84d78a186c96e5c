//! Re-read a capability table under its resolved header.
//!
//! The header row becomes the column-name row; everything at or above it is
//! discarded. Column names are trimmed, matched columns are renamed to their
//! canonical names, and rows without a usable capability are dropped.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::header::is_blank_value;
use crate::models::{CanonicalColumn, HeaderMatch, NormalizedRow, Provenance, RawGrid};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("No header row was resolved")]
    HeaderNotResolved,

    #[error("Missing required columns: {}", format_columns(.0))]
    MissingColumns(Vec<CanonicalColumn>),
}

fn format_columns(columns: &[CanonicalColumn]) -> String {
    columns
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A table with named columns, as read below a header row.
#[derive(Debug, Clone)]
pub struct HeaderedTable {
    /// Trimmed column names, one per header cell. Blank header cells are
    /// named `Unnamed: {index}`.
    pub columns: Vec<String>,
    pub header_row: usize,
    pub rows: Vec<Vec<String>>,
}

impl HeaderedTable {
    /// Split `grid` at `header_row`.
    pub fn from_grid(grid: &RawGrid, header_row: usize) -> Self {
        let width = grid
            .rows()
            .iter()
            .skip(header_row)
            .map(|r| r.len())
            .max()
            .unwrap_or(0);

        let columns = (0..width)
            .map(|idx| {
                let name = grid.cell(header_row, idx).to_text().trim().to_string();
                if name.is_empty() {
                    format!("Unnamed: {}", idx)
                } else {
                    name
                }
            })
            .collect();

        let rows = (header_row + 1..grid.len())
            .map(|r| (0..width).map(|c| grid.cell(r, c).to_text()).collect())
            .collect();

        Self {
            columns,
            header_row,
            rows,
        }
    }

    /// Rename columns whose trimmed name appears in `renames`.
    pub fn rename(&mut self, renames: &BTreeMap<String, String>) {
        for column in self.columns.iter_mut() {
            if let Some(new_name) = renames.get(column.trim()) {
                *column = new_name.clone();
            }
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Header label to canonical label, keyed by the trimmed header text of
/// each mapped column.
pub fn header_renames(grid: &RawGrid, header: &HeaderMatch) -> BTreeMap<String, String> {
    let mut renames = BTreeMap::new();
    if let HeaderMatch::Found {
        row_index,
        column_mapping,
    } = header
    {
        for (idx, column) in column_mapping {
            let label = grid.cell(*row_index, *idx).to_text().trim().to_string();
            if !label.is_empty() {
                renames
                    .entry(label)
                    .or_insert_with(|| column.label().to_string());
            }
        }
    }
    renames
}

/// Capability text is usable: non-empty after trim and not `nan`.
pub fn has_capability(value: &str) -> bool {
    !is_blank_value(value)
}

/// Read the data rows of `grid` below its resolved header.
///
/// Fails when the header was not resolved or when, after renaming, any of
/// the three canonical columns is absent from the table.
pub fn normalize(
    grid: &RawGrid,
    header: &HeaderMatch,
    provenance: &Provenance,
) -> Result<Vec<NormalizedRow>, NormalizeError> {
    let header_row = header
        .row_index()
        .ok_or(NormalizeError::HeaderNotResolved)?;

    let mut table = HeaderedTable::from_grid(grid, header_row);
    table.rename(&header_renames(grid, header));

    let mut indices: BTreeMap<CanonicalColumn, usize> = BTreeMap::new();
    let mut missing = Vec::new();
    for column in CanonicalColumn::ALL {
        match table.column_index(column.label()) {
            Some(idx) => {
                indices.insert(column, idx);
            }
            None => missing.push(column),
        }
    }
    if !missing.is_empty() {
        return Err(NormalizeError::MissingColumns(missing));
    }

    let field = |row: &[String], column: CanonicalColumn| -> String {
        indices
            .get(&column)
            .and_then(|idx| row.get(*idx))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let rows = table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(offset, row)| {
            let capability = field(row, CanonicalColumn::Capability);
            if !has_capability(&capability) {
                return None;
            }
            Some(NormalizedRow {
                capability,
                scope_description: field(row, CanonicalColumn::ScopeBusinessDescription),
                system_changes: field(row, CanonicalColumn::SystemChanges),
                source_file: provenance.file_name.clone(),
                source_path: provenance.file_path.clone(),
                sheet_name: provenance.sheet_name.clone(),
                row_index: offset + header_row + 1,
            })
        })
        .collect();

    Ok(rows)
}
