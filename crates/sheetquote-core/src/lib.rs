//! Core library for spreadsheet invoice and quotation extraction.
//!
//! This crate provides:
//! - A worksheet model with merged-cell resolution and workbook loading
//! - Item table header detection for mixed Korean/English layouts
//! - Row classification into categories, line items and skipped rows
//! - Value normalization for amounts, quantities and descriptions
//! - Document assembly with header/summary label scanning
//! - Fixed-coordinate templates for known layouts

pub mod error;
pub mod extract;
pub mod models;
pub mod sheet;

pub use error::{ExtractionError, Result, SheetQuoteError, WorkbookError};
pub use extract::{
    clean_number, detect_layout, DocumentExtractor, ExtractionResult, HeaderLocator, SheetInvoiceParser,
    TemplateRegistry,
};
pub use models::config::ExtractConfig;
pub use models::document::{CategoryGroup, CleanValue, FlatRow, InvoiceDocument, Items, LineItem};
pub use sheet::{load_worksheet, CellValue, SheetView, Worksheet};
