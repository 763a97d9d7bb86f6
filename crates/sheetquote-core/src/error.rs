//! Error types for the sheetquote-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the sheetquote library.
#[derive(Error, Debug)]
pub enum SheetQuoteError {
    /// Workbook could not be opened or read.
    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// Document extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while opening a workbook. These are fatal for the file
/// being processed but never for a batch.
#[derive(Error, Debug)]
pub enum WorkbookError {
    /// The file cannot be opened or parsed as a workbook.
    #[error("malformed workbook {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The workbook has no worksheets.
    #[error("workbook {0} has no worksheets")]
    NoSheets(PathBuf),

    /// A named worksheet was requested but is absent.
    #[error("worksheet '{name}' not found in {path}")]
    SheetNotFound { path: PathBuf, name: String },
}

/// Non-fatal issues raised during extraction. They are collected on the
/// extraction result instead of aborting it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// No row within the scan range matched enough header keywords.
    #[error("no header row found in rows {first_row}..={last_row}")]
    HeaderNotFound { first_row: u32, last_row: u32 },

    /// A named template was requested but is not registered.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// A cell expected to be numeric could not be coerced; the raw value was kept.
    #[error("row {row}: could not coerce {field} value '{value}' to a number")]
    ValueCoercion {
        row: u32,
        field: String,
        value: String,
    },
}

/// Result type for the sheetquote library.
pub type Result<T> = std::result::Result<T, SheetQuoteError>;
