//! Configuration structures for the extraction engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetQuoteError};
use crate::extract::templates::Template;

/// Main configuration for sheetquote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Item table header detection.
    pub header_scan: HeaderScanConfig,

    /// Header and summary label scanning.
    pub labels: LabelConfig,

    /// Layout templates.
    pub templates: TemplateConfig,

    /// Batch processing.
    pub batch: BatchConfig,
}

/// Item table header detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderScanConfig {
    /// First row to scan (1-based).
    pub first_row: u32,

    /// Last row to scan (inclusive).
    pub last_row: u32,

    /// Number of distinct fields that must be bound to accept a header row.
    pub min_fields: usize,
}

impl Default for HeaderScanConfig {
    fn default() -> Self {
        Self {
            first_row: 1,
            last_row: 40,
            min_fields: 2,
        }
    }
}

/// Keywords for one summary field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryLabel {
    /// Output field name.
    pub field: String,

    /// Label variants, compared after normalization.
    pub keywords: Vec<String>,
}

impl SummaryLabel {
    pub fn new(field: &str, keywords: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Header and summary label scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Literal header labels looked up in the header region.
    pub header_labels: Vec<String>,

    /// Number of rows, from the top, holding header labels.
    pub header_region_rows: u32,

    /// Summary fields and their label keywords.
    pub summary_fields: Vec<SummaryLabel>,

    /// Longer normalized cell texts are never treated as summary labels.
    pub max_summary_label_len: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            header_labels: [
                "DATE",
                "QUOTATION #",
                "Payment date",
                "SHIP TO",
                "발급일",
                "공급자",
                "등록번호",
                "상호",
                "대표이사",
                "사업자 주소",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            header_region_rows: 15,
            summary_fields: vec![
                SummaryLabel::new("subtotal", &["Sub total", "Subtotal", "소계", "합계"]),
                SummaryLabel::new("tax_rate", &["Tax rate", "세율"]),
                SummaryLabel::new("tax_due", &["Tax due", "세금", "부가세", "VAT"]),
                SummaryLabel::new("other", &["Other", "기타"]),
                SummaryLabel::new(
                    "total_due",
                    &["TOTAL Due", "총액", "총합계", "Grand total", "TOTAL"],
                ),
            ],
            max_summary_label_len: 24,
        }
    }
}

/// Layout templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Use coordinate templates for detected layouts.
    pub enabled: bool,

    /// Additional templates; a template named like a built-in replaces it.
    pub custom: Vec<Template>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            custom: Vec::new(),
        }
    }
}

/// Batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of workbooks processed at once.
    pub jobs: usize,

    /// Exit successfully even when some files failed.
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            continue_on_error: false,
        }
    }
}

impl ExtractConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let scan = &self.header_scan;
        if scan.first_row == 0 || scan.first_row > scan.last_row {
            return Err(SheetQuoteError::Config(format!(
                "invalid header scan range {}..={}",
                scan.first_row, scan.last_row
            )));
        }
        if scan.min_fields == 0 {
            return Err(SheetQuoteError::Config(
                "header_scan.min_fields must be at least 1".to_string(),
            ));
        }
        if self.batch.jobs == 0 {
            return Err(SheetQuoteError::Config(
                "batch.jobs must be at least 1".to_string(),
            ));
        }
        for template in &self.templates.custom {
            template.validate()?;
        }
        Ok(())
    }
}
