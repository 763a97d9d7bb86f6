//! Worksheet document assembler.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::classifier::{ClassifiedRow, RowClassifier};
use super::header::{HeaderLocator, HeaderMap};
use super::labels::{read_cells, scan_header_labels, SummaryScanner};
use super::normalize::clean_number;
use super::templates::{Template, TemplateRegistry};
use super::DocumentExtractor;
use crate::error::ExtractionError;
use crate::models::config::{ExtractConfig, LabelConfig};
use crate::models::document::{
    CategoryGroup, CleanValue, DocumentMeta, FlatRow, InvoiceDocument, Items, LineItem,
};
use crate::sheet::{CellValue, SheetView};

/// Result of document extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted document.
    pub document: InvoiceDocument,
    /// Non-fatal problems met while extracting.
    pub issues: Vec<ExtractionError>,
    /// Item table header row.
    pub header_row: Option<u32>,
    /// Template used for the fast path.
    pub template: Option<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl ExtractionResult {
    /// True when extraction degraded somewhere.
    pub fn is_partial(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Extracts invoices and quotations from worksheets using header
/// detection, row classification and label scanning, with a template fast
/// path for known layouts.
pub struct SheetInvoiceParser {
    locator: HeaderLocator,
    labels: LabelConfig,
    registry: TemplateRegistry,
    use_templates: bool,
    template: Option<String>,
}

impl SheetInvoiceParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self {
            locator: HeaderLocator::new(),
            labels: LabelConfig::default(),
            registry: TemplateRegistry::new(),
            use_templates: true,
            template: None,
        }
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            locator: HeaderLocator::from_config(&config.header_scan),
            labels: config.labels.clone(),
            registry: TemplateRegistry::new().with_templates(config.templates.custom.clone()),
            use_templates: config.templates.enabled,
            template: None,
        }
    }

    /// Set the header locator.
    pub fn with_locator(mut self, locator: HeaderLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Set label scanning options.
    pub fn with_labels(mut self, labels: LabelConfig) -> Self {
        self.labels = labels;
        self
    }

    /// Enable or disable the template fast path.
    pub fn with_templates(mut self, enabled: bool) -> Self {
        self.use_templates = enabled;
        self
    }

    /// Force a named template instead of detecting the layout.
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    fn resolve_template<S: SheetView + ?Sized>(
        &self,
        sheet: &S,
        issues: &mut Vec<ExtractionError>,
    ) -> Option<&Template> {
        if let Some(name) = &self.template {
            match self.registry.get(name) {
                Ok(template) => return Some(template),
                Err(e) => {
                    warn!("{}; falling back to layout detection", e);
                    issues.push(e);
                }
            }
        }
        if self.use_templates || self.template.is_some() {
            self.registry.detect(sheet)
        } else {
            None
        }
    }

    fn assemble_items<S: SheetView + ?Sized>(
        &self,
        sheet: &S,
        header_row: u32,
        map: &HeaderMap,
        table_rows: &mut HashSet<u32>,
        issues: &mut Vec<ExtractionError>,
    ) -> Items {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        let mut has_categories = false;

        for (row, classified) in RowClassifier::new(sheet, header_row, map) {
            match classified {
                ClassifiedRow::Category { name, total } => {
                    debug!("Row {}: category '{}'", row, name);
                    if let Some(CleanValue::Text(raw)) = &total {
                        issues.push(coercion(row, "category_total", raw));
                    }
                    has_categories = true;
                    table_rows.insert(row);
                    groups.push(CategoryGroup {
                        category: Some(name),
                        category_total: total,
                        items: Vec::new(),
                    });
                }
                ClassifiedRow::Item(mut item) => {
                    check_coercion(row, &item, issues);
                    table_rows.insert(row);
                    if groups.is_empty() {
                        groups.push(CategoryGroup {
                            category: None,
                            category_total: None,
                            items: Vec::new(),
                        });
                    }
                    if let Some(group) = groups.last_mut() {
                        item.category = group.category.clone();
                        group.items.push(item);
                    }
                }
                ClassifiedRow::Skip => {}
            }
        }

        if has_categories {
            Items::Grouped(groups)
        } else {
            Items::Flat(
                groups
                    .into_iter()
                    .flat_map(|g| g.items)
                    .map(FlatRow::Item)
                    .collect(),
            )
        }
    }

    fn extract_header<S: SheetView + ?Sized>(
        &self,
        sheet: &S,
        template: Option<&Template>,
    ) -> BTreeMap<String, CellValue> {
        if let Some(template) = template {
            let header = read_cells(sheet, &template.header);
            if !header.is_empty() {
                return header;
            }
            debug!("Template '{}' header cells are blank; scanning labels", template.name);
        }
        scan_header_labels(sheet, &self.labels.header_labels, self.labels.header_region_rows)
    }

    fn extract_summary<S: SheetView + ?Sized>(
        &self,
        sheet: &S,
        template: Option<&Template>,
        excluded_rows: &HashSet<u32>,
    ) -> BTreeMap<String, Option<CleanValue>> {
        if let Some(template) = template {
            let summary: BTreeMap<String, Option<CleanValue>> = template
                .summary
                .iter()
                .map(|(key, cell)| (key.clone(), clean_number(sheet.value_at(*cell))))
                .collect();
            if summary.values().any(Option::is_some) {
                return summary;
            }
            debug!("Template '{}' summary cells are blank; scanning labels", template.name);
        }
        SummaryScanner::from_config(&self.labels).scan(sheet, excluded_rows)
    }
}

impl Default for SheetInvoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for SheetInvoiceParser {
    fn extract(&self, sheet: &dyn SheetView, file_name: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut issues = Vec::new();

        info!("Extracting '{}' (sheet '{}')", file_name, sheet.name());

        let template = self.resolve_template(sheet, &mut issues);

        let location = self.locator.locate(sheet);
        let (header_row, map) = match (location.row, template.and_then(|t| t.items.as_ref())) {
            (Some(row), _) => (Some(row), location.map),
            (None, layout) => {
                let (first_row, last_row) = self.locator.scan_range();
                warn!("No header row in rows {}..={} of '{}'", first_row, last_row, file_name);
                issues.push(ExtractionError::HeaderNotFound { first_row, last_row });
                match layout {
                    Some(layout) => {
                        debug!("Using template item columns, header row {}", layout.header_row());
                        (Some(layout.header_row()), layout.header_map())
                    }
                    None => (None, HeaderMap::default()),
                }
            }
        };

        let mut table_rows = HashSet::new();
        let items = match header_row {
            Some(row) => {
                table_rows.insert(row);
                self.assemble_items(sheet, row, &map, &mut table_rows, &mut issues)
            }
            None => Items::default(),
        };

        let header = self.extract_header(sheet, template);
        let summary = self.extract_summary(sheet, template, &table_rows);

        let document = InvoiceDocument {
            meta: DocumentMeta {
                file_name: file_name.to_string(),
                sheet_name: Some(sheet.name().to_string()),
                template: template.map(|t| t.name.clone()),
                header_row,
            },
            header,
            items,
            summary,
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} items, {} header fields, {} issues in {}ms",
            document.items.len(),
            document.header.len(),
            issues.len(),
            processing_time_ms
        );

        ExtractionResult {
            template: document.meta.template.clone(),
            header_row,
            document,
            issues,
            processing_time_ms,
        }
    }
}

fn coercion(row: u32, field: &str, raw: &str) -> ExtractionError {
    warn!("Row {}: {} value '{}' is not numeric; keeping text", row, field, raw);
    ExtractionError::ValueCoercion {
        row,
        field: field.to_string(),
        value: raw.to_string(),
    }
}

fn check_coercion(row: u32, item: &LineItem, issues: &mut Vec<ExtractionError>) {
    let numeric = [
        ("unit_price", &item.unit_price),
        ("quantity", &item.quantity),
        ("amount", &item.amount),
    ];
    for (field, value) in numeric {
        if let Some(CleanValue::Text(raw)) = value {
            issues.push(coercion(row, field, raw));
        }
    }
}
