//! Spreadsheet access.
//!
//! Opens a workbook with `calamine` (format detected from the extension:
//! `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) and reads a single sheet into a
//! [`RawGrid`] without assuming where the header is. The grid is anchored at
//! cell A1, so blank leading rows and columns are preserved.

use calamine::{open_workbook_auto, Data, DataType, Reader, Sheets};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Cell, RawGrid};

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("File does not exist: {0}")]
    FileNotFound(PathBuf),

    #[error("Cannot open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Sheet '{sheet}' not found (available: {})", available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("Cannot read sheet '{sheet}': {source}")]
    Read {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
}

/// An open workbook.
pub struct Workbook {
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        if !path.is_file() {
            return Err(WorkbookError::FileNotFound(path.to_path_buf()));
        }
        let sheets = open_workbook_auto(path).map_err(|source| WorkbookError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|s| s == name)
    }

    /// Read `sheet` into a headerless grid.
    pub fn read_grid(&mut self, sheet: &str) -> Result<RawGrid, WorkbookError> {
        if !self.has_sheet(sheet) {
            return Err(WorkbookError::SheetNotFound {
                sheet: sheet.to_string(),
                available: self.sheet_names(),
            });
        }

        let range = self
            .sheets
            .worksheet_range(sheet)
            .map_err(|source| WorkbookError::Read {
                sheet: sheet.to_string(),
                source,
            })?;

        let (start_row, start_col) = match range.start() {
            Some((r, c)) => (r as usize, c as usize),
            None => return Ok(RawGrid::default()),
        };

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_col];
            cells.extend(row.iter().map(to_cell));
            rows.push(cells);
        }

        Ok(RawGrid::new(rows))
    }
}

/// Open `path` and read `sheet` in one step.
pub fn read_sheet(path: &Path, sheet: &str) -> Result<RawGrid, WorkbookError> {
    Workbook::open(path)?.read_grid(sheet)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(_) => data
            .as_datetime()
            .map(|dt| Cell::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        // Empty cells and formula errors
        _ => Cell::Empty,
    }
}
