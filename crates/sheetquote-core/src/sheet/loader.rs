//! Workbook loading through calamine.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Dimensions, Range, Reader, Sheets};
use tracing::{debug, warn};

use super::{CellValue, MergeRange, Worksheet};
use crate::error::WorkbookError;

/// A worksheet read from disk together with its origin.
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    /// Source file.
    pub path: PathBuf,
    /// The worksheet contents.
    pub sheet: Worksheet,
    /// All sheet names in the workbook.
    pub sheet_names: Vec<String>,
}

impl LoadedSheet {
    /// File name of the source workbook.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Load the first worksheet of a workbook.
pub fn load_worksheet(path: &Path) -> Result<LoadedSheet, WorkbookError> {
    load(path, None)
}

/// Load a worksheet by name.
pub fn load_named_worksheet(path: &Path, name: &str) -> Result<LoadedSheet, WorkbookError> {
    load(path, Some(name))
}

fn load(path: &Path, name: Option<&str>) -> Result<LoadedSheet, WorkbookError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| malformed(path, e))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = match name {
        Some(name) => sheet_names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| WorkbookError::SheetNotFound {
                path: path.to_path_buf(),
                name: name.to_string(),
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| WorkbookError::NoSheets(path.to_path_buf()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| malformed(path, e))?;

    let merges = match &mut workbook {
        Sheets::Xlsx(xlsx) => xlsx
            .worksheet_merge_cells(&sheet_name)
            .unwrap_or(Ok(Vec::new()))
            .unwrap_or_else(|e| {
                warn!("Ignoring merged regions of '{}': {}", sheet_name, e);
                Vec::new()
            }),
        _ => Vec::new(),
    };

    let sheet = to_worksheet(&sheet_name, &range, &merges);
    debug!(
        "Loaded sheet '{}' from {}: {} cells, {} merges",
        sheet_name,
        path.display(),
        sheet.cell_count(),
        merges.len()
    );

    Ok(LoadedSheet {
        path: path.to_path_buf(),
        sheet,
        sheet_names,
    })
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> WorkbookError {
    WorkbookError::Malformed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Convert a calamine range (0-based, possibly offset) into a 1-based worksheet.
fn to_worksheet(name: &str, range: &Range<Data>, merges: &[Dimensions]) -> Worksheet {
    let mut sheet = Worksheet::new(name);
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    for (r, c, data) in range.used_cells() {
        let value = convert_data(data);
        if value != CellValue::Empty {
            sheet.set(start_row + r as u32 + 1, start_col + c as u32 + 1, value);
        }
    }

    for dim in merges {
        sheet.add_merge(MergeRange::new(
            dim.start.0 + 1,
            dim.start.1 + 1,
            dim.end.0 + 1,
            dim.end.1 + 1,
        ));
    }

    sheet
}

fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::DateTime(naive),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}
