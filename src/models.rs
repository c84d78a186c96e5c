//! Core data models used throughout Capability Lookup.
//!
//! These types represent the grids, rows, chunks, and reports that flow
//! through the validation, ingestion, and query pipelines.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single worksheet cell, read without any type or header assumption.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Text rendering of the cell. Integral numbers drop their fractional part.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Cell::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

/// A worksheet read without any header assumption.
///
/// Row 0 is the first row of the sheet; leading blank rows are kept so
/// indices line up with the workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string literals. Empty strings become [`Cell::Empty`].
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| Cell::from(s.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `(row, column)`; cells past the end of a short row are empty.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }
}

/// The three logical columns every capability table exposes under some alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CanonicalColumn {
    Capability,
    ScopeBusinessDescription,
    SystemChanges,
}

impl CanonicalColumn {
    /// Resolution order. Earlier names claim a column first.
    pub const ALL: [CanonicalColumn; 3] = [
        CanonicalColumn::Capability,
        CanonicalColumn::ScopeBusinessDescription,
        CanonicalColumn::SystemChanges,
    ];

    /// Display label used in reports and stored column names.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalColumn::Capability => "Capability",
            CanonicalColumn::ScopeBusinessDescription => "Scope / Business Description",
            CanonicalColumn::SystemChanges => "System Changes",
        }
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of scanning a grid for its header row.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderMatch {
    NotFound,
    Found {
        /// Zero-based row index of the header within the grid.
        row_index: usize,
        /// Original column index to canonical column.
        column_mapping: BTreeMap<usize, CanonicalColumn>,
    },
}

impl HeaderMatch {
    pub fn is_found(&self) -> bool {
        matches!(self, HeaderMatch::Found { .. })
    }

    pub fn row_index(&self) -> Option<usize> {
        match self {
            HeaderMatch::Found { row_index, .. } => Some(*row_index),
            HeaderMatch::NotFound => None,
        }
    }

    /// Column index that was resolved for `column`, if any.
    pub fn column_for(&self, column: CanonicalColumn) -> Option<usize> {
        match self {
            HeaderMatch::Found { column_mapping, .. } => column_mapping
                .iter()
                .find(|(_, c)| **c == column)
                .map(|(idx, _)| *idx),
            HeaderMatch::NotFound => None,
        }
    }
}

/// Where a row came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub file_name: String,
    pub file_path: String,
    pub sheet_name: String,
}

/// One business record read from a capability table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub capability: String,
    pub scope_description: String,
    pub system_changes: String,
    pub source_file: String,
    pub source_path: String,
    pub sheet_name: String,
    pub row_index: usize,
}

/// Metadata stored alongside every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct ChunkMetadata {
    pub file_name: String,
    pub file_path: String,
    pub sheet_name: String,
    pub row_index: i64,
    pub capability: String,
    pub scope_description: String,
    pub system_changes: String,
    /// RFC 3339 timestamp captured when the chunk was built.
    pub indexed_at: String,
}

/// An embeddable unit derived from exactly one [`NormalizedRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// SHA-256 of `text`.
    pub hash: String,
    pub metadata: ChunkMetadata,
}

/// Per-file outcome of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub file_name: String,
    pub file_path: String,
    pub is_valid: bool,
    pub sheets: Vec<String>,
    pub header_row: Option<usize>,
    pub column_mapping: Option<BTreeMap<String, String>>,
    pub data_rows: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn new(file_name: String, file_path: String) -> Self {
        Self {
            file_name,
            file_path,
            is_valid: false,
            sheets: Vec::new(),
            header_row: None,
            column_mapping: None,
            data_rows: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// A validation run over a directory.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub directory: String,
    pub files: Vec<ValidationResult>,
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status of one file in an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Indexed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileIngestResult {
    pub file_name: String,
    pub file_path: String,
    pub status: FileStatus,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub directory: String,
    pub dry_run: bool,
    pub files: Vec<FileIngestResult>,
    pub files_found: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub total_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One ranked match in a [`QueryResult`].
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityMatch {
    pub rank: usize,
    pub capability: String,
    pub business_description: String,
    pub system_changes: String,
    pub similarity_score: f64,
    pub distance: f64,
    pub file_name: String,
    pub source_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Structured answer to a free-text question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub overview: String,
    pub matches: Vec<CapabilityMatch>,
    pub total_found: usize,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Chunk inventory for one source workbook.
#[derive(Debug, Clone, Serialize)]
pub struct FileInventory {
    pub file_name: String,
    pub file_path: String,
    pub chunks: usize,
    pub last_indexed_at: Option<String>,
}

/// Summary of what is currently stored.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub collection: String,
    pub database_path: String,
    pub database_bytes: u64,
    pub total_chunks: usize,
    pub source_files: usize,
    pub embedding_models: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_number_rendering() {
        assert_eq!(Cell::Number(42.0).to_text(), "42");
        assert_eq!(Cell::Number(1.5).to_text(), "1.5");
        assert_eq!(Cell::Number(-3.0).to_text(), "-3");
        assert_eq!(Cell::Bool(true).to_text(), "TRUE");
        assert_eq!(Cell::Empty.to_text(), "");
    }

    #[test]
    fn test_grid_cell_past_row_end_is_empty() {
        let grid = RawGrid::from_strings(vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(grid.cell(1, 1), &Cell::Empty);
        assert_eq!(grid.cell(5, 0), &Cell::Empty);
        assert_eq!(grid.cell(0, 1), &Cell::Text("b".to_string()));
    }

    #[test]
    fn test_header_match_column_lookup() {
        let mut mapping = BTreeMap::new();
        mapping.insert(2, CanonicalColumn::SystemChanges);
        mapping.insert(0, CanonicalColumn::Capability);
        let m = HeaderMatch::Found {
            row_index: 1,
            column_mapping: mapping,
        };
        assert_eq!(m.column_for(CanonicalColumn::SystemChanges), Some(2));
        assert_eq!(m.column_for(CanonicalColumn::ScopeBusinessDescription), None);
        assert_eq!(m.row_index(), Some(1));
        assert!(!HeaderMatch::NotFound.is_found());
    }
}
