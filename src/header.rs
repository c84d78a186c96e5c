//! Heuristic header-row detection.
//!
//! Capability workbooks rarely agree on where their table starts or what the
//! columns are called. [`resolve`] scans the first [`HEADER_SCAN_ROWS`] rows
//! of a [`RawGrid`] for a row that names all three [`CanonicalColumn`]s,
//! using the alias table in [`COLUMN_VARIANTS`].
//!
//! Matching rules, applied to a cell after trimming and lower-casing:
//!
//! | Rule | Predicate |
//! |------|-----------|
//! | exact | [`is_exact_alias`]: the cell equals an alias |
//! | substring | [`contains_alias`]: the cell contains an alias |
//!
//! Canonical names are resolved in [`CanonicalColumn::ALL`] order and each
//! takes the leftmost eligible cell. A cell claimed by an earlier name is
//! not offered to later ones. The first qualifying row wins.
//!
//! Substring matching is deliberately loose ("scope" matches
//! "scope / business description") and can over-match neighbouring header
//! text such as "Out of scope notes".

use std::collections::BTreeMap;

use crate::models::{CanonicalColumn, Cell, HeaderMatch, RawGrid};

/// Rows at or beyond this index are never considered a header.
pub const HEADER_SCAN_ROWS: usize = 10;

/// Canonical column to its accepted lowercase aliases.
pub const COLUMN_VARIANTS: [(CanonicalColumn, &[&str]); 3] = [
    (
        CanonicalColumn::Capability,
        &[
            "capability",
            "capabilities",
            "cap",
            "function",
            "feature",
            "business capability",
        ],
    ),
    (
        CanonicalColumn::ScopeBusinessDescription,
        &[
            "scope",
            "business description",
            "description",
            "scope/business description",
            "scope / business description",
        ],
    ),
    (
        CanonicalColumn::SystemChanges,
        &[
            "system changes",
            "system change",
            "changes",
            "technical changes",
            "system modifications",
        ],
    ),
];

/// Aliases for a canonical column.
pub fn aliases(column: CanonicalColumn) -> &'static [&'static str] {
    COLUMN_VARIANTS
        .iter()
        .find(|(c, _)| *c == column)
        .map(|(_, a)| *a)
        .unwrap_or(&[])
}

/// Trimmed, lower-cased cell text, or `None` when the cell can never match.
pub fn normalize_cell(cell: &Cell) -> Option<String> {
    let value = cell.to_text().trim().to_lowercase();
    if is_blank_value(&value) {
        None
    } else {
        Some(value)
    }
}

/// Empty or the literal `nan` (any case).
pub fn is_blank_value(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("nan")
}

pub fn is_exact_alias(value: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|a| *a == value)
}

pub fn contains_alias(value: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|a| value.contains(a))
}

/// A normalized cell value names `column`.
pub fn matches_column(value: &str, column: CanonicalColumn) -> bool {
    let aliases = aliases(column);
    is_exact_alias(value, aliases) || contains_alias(value, aliases)
}

/// Try to read row `row_index` as a header. Returns the column mapping only
/// when all three canonical columns were found.
pub fn match_row(grid: &RawGrid, row_index: usize) -> Option<BTreeMap<usize, CanonicalColumn>> {
    let row = grid.row(row_index)?;
    let normalized: Vec<Option<String>> = row.iter().map(normalize_cell).collect();

    let mut mapping: BTreeMap<usize, CanonicalColumn> = BTreeMap::new();
    for column in CanonicalColumn::ALL {
        let found = normalized.iter().enumerate().find(|(idx, value)| {
            !mapping.contains_key(idx)
                && value
                    .as_deref()
                    .map(|v| matches_column(v, column))
                    .unwrap_or(false)
        });
        if let Some((idx, _)) = found {
            mapping.insert(idx, column);
        }
    }

    if mapping.len() == CanonicalColumn::ALL.len() {
        Some(mapping)
    } else {
        None
    }
}

/// Locate the header row of a capability table.
///
/// Never fails: a grid without a recognizable header yields
/// [`HeaderMatch::NotFound`].
pub fn resolve(grid: &RawGrid) -> HeaderMatch {
    let limit = grid.len().min(HEADER_SCAN_ROWS);
    for row_index in 0..limit {
        if let Some(column_mapping) = match_row(grid, row_index) {
            return HeaderMatch::Found {
                row_index,
                column_mapping,
            };
        }
    }
    HeaderMatch::NotFound
}
