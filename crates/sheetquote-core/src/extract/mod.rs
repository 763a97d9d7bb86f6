//! Document extraction from worksheets.

mod assembler;
mod classifier;
mod header;
pub mod keywords;
pub mod labels;
pub mod normalize;
pub mod templates;

pub use assembler::{ExtractionResult, SheetInvoiceParser};
pub use classifier::{ClassifiedRow, RowClassifier};
pub use header::{HeaderLocation, HeaderLocator, HeaderMap};
pub use keywords::Field;
pub use normalize::{clean_number, clean_text};
pub use templates::{detect_layout, ItemLayout, Template, TemplateRegistry};

use std::path::Path;

use crate::error::Result;
use crate::sheet::{load_worksheet, SheetView};

/// Trait for worksheet document extractors.
pub trait DocumentExtractor {
    /// Extract a document from a worksheet. Problems inside the sheet are
    /// reported on the result rather than failing the call.
    fn extract(&self, sheet: &dyn SheetView, file_name: &str) -> ExtractionResult;

    /// Load the first worksheet of a workbook and extract it. Only failures
    /// to open the workbook are errors.
    fn extract_file(&self, path: &Path) -> Result<ExtractionResult> {
        let loaded = load_worksheet(path)?;
        Ok(self.extract(&loaded.sheet, &loaded.file_name()))
    }
}
