//! Dry structural check of capability workbooks.
//!
//! [`validate_file`] never fails: every problem ends up as a string in the
//! returned [`ValidationResult`]. Steps short-circuit on the first blocking
//! error:
//!
//! 1. the file exists
//! 2. the capability sheet is present (all sheet names are recorded)
//! 3. a header row is resolved
//! 4. rows are normalized and counted into `data_rows`
//!
//! A file is valid when steps 1-3 pass. Zero data rows is only a warning.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::WorkbooksConfig;
use crate::discover::{discover_workbooks, display_path, file_name};
use crate::header::{resolve, HEADER_SCAN_ROWS};
use crate::models::{
    CanonicalColumn, HeaderMatch, Provenance, RawGrid, ValidationReport, ValidationResult,
};
use crate::normalize::normalize;
use crate::workbook::Workbook;

pub fn validate_file(path: &Path, sheet: &str) -> ValidationResult {
    let mut result = ValidationResult::new(file_name(path), display_path(path));

    if !path.is_file() {
        result
            .errors
            .push(format!("File does not exist: {}", path.display()));
        return result;
    }

    let mut workbook = match Workbook::open(path) {
        Ok(wb) => wb,
        Err(e) => {
            result.errors.push(e.to_string());
            return result;
        }
    };

    result.sheets = workbook.sheet_names();
    if !workbook.has_sheet(sheet) {
        result.errors.push(format!(
            "Required sheet '{}' not found. Available sheets: {}",
            sheet,
            result.sheets.join(", ")
        ));
        return result;
    }

    let grid = match workbook.read_grid(sheet) {
        Ok(grid) => grid,
        Err(e) => {
            result.errors.push(e.to_string());
            return result;
        }
    };

    let header = resolve(&grid);
    let (header_row, mapping) = match &header {
        HeaderMatch::Found {
            row_index,
            column_mapping,
        } => (*row_index, column_mapping),
        HeaderMatch::NotFound => {
            result.errors.push(format!(
                "Could not find required columns ({}) in the first {} rows",
                CanonicalColumn::ALL
                    .iter()
                    .map(|c| c.label())
                    .collect::<Vec<_>>()
                    .join(", "),
                HEADER_SCAN_ROWS
            ));
            return result;
        }
    };

    result.is_valid = true;
    result.header_row = Some(header_row);
    result.column_mapping = Some(describe_mapping(&grid, header_row, mapping));

    let provenance = Provenance {
        file_name: result.file_name.clone(),
        file_path: result.file_path.clone(),
        sheet_name: sheet.to_string(),
    };
    match normalize(&grid, &header, &provenance) {
        Ok(rows) => result.data_rows = rows.len(),
        Err(e) => result.warnings.push(format!("Rows could not be read: {}", e)),
    }

    if result.data_rows == 0 {
        result
            .warnings
            .push("No data rows with a capability were found".to_string());
    }

    result
}

/// Header text (or `column {n}` for blank headers) to canonical label.
fn describe_mapping(
    grid: &RawGrid,
    header_row: usize,
    mapping: &BTreeMap<usize, CanonicalColumn>,
) -> BTreeMap<String, String> {
    mapping
        .iter()
        .map(|(idx, column)| {
            let label = grid.cell(header_row, *idx).to_text().trim().to_string();
            let key = if label.is_empty() {
                format!("column {}", idx)
            } else {
                label
            };
            (key, column.label().to_string())
        })
        .collect()
}

/// Validate every workbook under `dir`. A missing or unreadable directory
/// yields an empty report with `error` set.
pub fn validate_directory(dir: &Path, config: &WorkbooksConfig) -> ValidationReport {
    let mut report = ValidationReport {
        directory: dir.display().to_string(),
        files: Vec::new(),
        total_files: 0,
        valid_files: 0,
        invalid_files: 0,
        error: None,
    };

    let paths = match discover_workbooks(dir, config) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(directory = %dir.display(), error = %e, "validation skipped");
            report.error = Some(e.to_string());
            return report;
        }
    };

    for path in paths {
        let result = validate_file(&path, &config.sheet_name);
        if result.is_valid {
            tracing::debug!(file = %result.file_name, data_rows = result.data_rows, "valid");
        } else {
            tracing::info!(file = %result.file_name, errors = ?result.errors, "invalid");
        }
        report.files.push(result);
    }

    report.total_files = report.files.len();
    report.valid_files = report.files.iter().filter(|f| f.is_valid).count();
    report.invalid_files = report.total_files - report.valid_files;
    report
}
