//! Fixed-coordinate templates for known layouts.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::header::HeaderMap;
use super::keywords::Field;
use crate::error::{ExtractionError, SheetQuoteError};
use crate::sheet::{column_index, CellRef, SheetView};

/// Built-in template names.
pub const ENGLISH_INVOICE: &str = "english_invoice";
pub const QUOTATION: &str = "quotation";
pub const KOREAN_QUOTATION: &str = "korean_quotation";
pub const CATEGORY_QUOTATION: &str = "category_quotation";
pub const TRANSACTION_STATEMENT: &str = "transaction_statement";

/// Position of the item table in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLayout {
    /// First data row; the header sits on the row above.
    pub start_row: u32,

    /// Column letters per field.
    pub columns: BTreeMap<Field, String>,
}

impl ItemLayout {
    /// Header map equivalent to the fixed columns.
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::default();
        for (field, letters) in &self.columns {
            if let Some(col) = column_index(letters) {
                map.bind(*field, col);
            }
        }
        map
    }

    /// Row holding the column titles.
    pub fn header_row(&self) -> u32 {
        self.start_row.saturating_sub(1)
    }
}

/// A named layout with fixed cell coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,

    /// Header field name to cell.
    #[serde(default)]
    pub header: BTreeMap<String, CellRef>,

    /// Summary field name to cell.
    #[serde(default)]
    pub summary: BTreeMap<String, CellRef>,

    /// Item table position.
    #[serde(default)]
    pub items: Option<ItemLayout>,
}

impl Template {
    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(SheetQuoteError::Config("template name must not be empty".into()));
        }
        if let Some(items) = &self.items {
            if items.start_row < 2 {
                return Err(SheetQuoteError::Config(format!(
                    "template '{}': items.start_row must be at least 2",
                    self.name
                )));
            }
            if let Some((field, letters)) = items
                .columns
                .iter()
                .find(|(_, letters)| column_index(letters).is_none())
            {
                return Err(SheetQuoteError::Config(format!(
                    "template '{}': invalid column '{}' for {}",
                    self.name, letters, field
                )));
            }
        }
        Ok(())
    }
}

fn template(
    name: &str,
    header: &[(&str, &str)],
    summary: &[(&str, &str)],
    start_row: u32,
    columns: &[(Field, &str)],
) -> Template {
    let cells = |pairs: &[(&str, &str)]| {
        pairs
            .iter()
            .filter_map(|(key, cell)| CellRef::parse(cell).map(|c| (key.to_string(), c)))
            .collect()
    };
    Template {
        name: name.to_string(),
        header: cells(header),
        summary: cells(summary),
        items: Some(ItemLayout {
            start_row,
            columns: columns
                .iter()
                .map(|(field, letters)| (*field, letters.to_string()))
                .collect(),
        }),
    }
}

lazy_static! {
    static ref BUILTIN_TEMPLATES: Vec<Template> = vec![
        template(
            ENGLISH_INVOICE,
            &[
                ("company", "A1"),
                ("address", "A2"),
                ("vat_number", "A8"),
                ("date", "E3"),
                ("quotation_no", "E4"),
                ("po", "E5"),
                ("ship_to", "E6"),
            ],
            &[
                ("subtotal", "E18"),
                ("tax_rate", "E19"),
                ("tax_due", "E20"),
                ("total_due", "E22"),
            ],
            12,
            &[
                (Field::Description, "A"),
                (Field::UnitPrice, "B"),
                (Field::Quantity, "C"),
                (Field::Unit, "D"),
                (Field::Amount, "E"),
                (Field::Remark, "F"),
            ],
        ),
        template(
            QUOTATION,
            &[
                ("title", "B6"),
                ("client", "G7"),
                ("purpose", "G8"),
                ("event_date", "G9"),
                ("manager", "G10"),
            ],
            &[
                ("subtotal", "F16"),
                ("grand_total", "F20"),
                ("agency_commission", "F21"),
                ("cut", "F22"),
                ("total_due", "F23"),
            ],
            11,
            &[
                (Field::Description, "B"),
                (Field::Quantity, "C"),
                (Field::Unit, "D"),
                (Field::UnitPrice, "E"),
                (Field::Amount, "F"),
                (Field::Remark, "G"),
            ],
        ),
        template(
            KOREAN_QUOTATION,
            &[
                ("title", "E1"),
                ("date", "E4"),
                ("company", "G3"),
                ("vat_number", "G4"),
                ("ceo", "G5"),
                ("address", "G6"),
            ],
            &[("subtotal", "W45"), ("tax_due", "W46"), ("total_due", "W47")],
            13,
            &[
                (Field::Description, "E"),
                (Field::Quantity, "R"),
                (Field::UnitPrice, "V"),
                (Field::Amount, "W"),
                (Field::Remark, "Y"),
            ],
        ),
        template(
            CATEGORY_QUOTATION,
            &[
                ("company", "B2"),
                ("quotation_title", "F2"),
                ("client", "G3"),
                ("purpose", "G4"),
                ("event_date", "G5"),
                ("manager", "G6"),
            ],
            &[
                ("grand_total", "F28"),
                ("agency_commission", "F29"),
                ("total_due", "F31"),
            ],
            10,
            &[
                (Field::Description, "C"),
                (Field::Quantity, "D"),
                (Field::Unit, "E"),
                (Field::UnitPrice, "F"),
                (Field::Amount, "G"),
                (Field::Remark, "H"),
            ],
        ),
        template(
            TRANSACTION_STATEMENT,
            &[
                ("title", "O2"),
                ("date", "D3"),
                ("company", "G4"),
                ("vat_number", "G5"),
                ("ceo", "G6"),
                ("address", "G7"),
            ],
            &[("subtotal", "W45"), ("tax_due", "W46"), ("total_due", "W47")],
            13,
            &[
                (Field::Description, "D"),
                (Field::Quantity, "N"),
                (Field::UnitPrice, "V"),
                (Field::Amount, "W"),
                (Field::Remark, "Y"),
            ],
        ),
    ];
}

/// Detect the layout of a worksheet from title and column probes.
pub fn detect_layout<S: SheetView + ?Sized>(sheet: &S) -> Option<&'static str> {
    let text = |row: u32, col: u32| sheet.value(row, col).as_text();
    let max_col = sheet.max_column();

    // Title in D1..G1
    if (4..=7).any(|col| {
        let upper = text(1, col).to_uppercase();
        upper.contains("INVOICE") || upper.contains("QUOTATION")
    }) {
        return Some(ENGLISH_INVOICE);
    }

    // Title in B6..G6
    if (2..=7).any(|col| text(6, col).to_uppercase().contains("QUOTATION")) {
        return Some(QUOTATION);
    }

    for row in 10..=20 {
        let names: Vec<String> = (1..=max_col)
            .map(|col| text(row, col).trim().to_uppercase())
            .collect();
        let has = |name: &str| names.iter().any(|n| n == name);
        if has("DESCRIPTION") && has("UNIT KRW") && has("QTY") {
            return Some(ENGLISH_INVOICE);
        }
        if has("ITEM") && has("UNIT COST (KRW)") && has("TOTAL AMOUNT (KRW)") {
            return Some(QUOTATION);
        }
    }

    if (8..=12).any(|row| (1..=max_col).any(|col| text(row, col).contains("Category"))) {
        return Some(CATEGORY_QUOTATION);
    }

    for row in 1..=6 {
        for col in 1..=max_col {
            let value = text(row, col);
            if value.contains("견적서") {
                return Some(KOREAN_QUOTATION);
            }
            if value.contains("거래명세서") {
                return Some(TRANSACTION_STATEMENT);
            }
        }
    }

    None
}

/// Named templates: the built-ins plus any configured ones.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    /// Registry holding the built-in templates.
    pub fn new() -> Self {
        Self {
            templates: BUILTIN_TEMPLATES.clone(),
        }
    }

    /// Add templates, replacing built-ins with the same name.
    pub fn with_templates(mut self, templates: impl IntoIterator<Item = Template>) -> Self {
        for template in templates {
            self.register(template);
        }
        self
    }

    pub fn register(&mut self, template: Template) {
        match self.templates.iter_mut().find(|t| t.name == template.name) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Result<&Template, ExtractionError> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ExtractionError::UnknownTemplate(name.to_string()))
    }

    /// Template for the detected layout of a worksheet.
    pub fn detect<S: SheetView + ?Sized>(&self, sheet: &S) -> Option<&Template> {
        let layout = detect_layout(sheet)?;
        debug!("Detected layout '{}' for sheet '{}'", layout, sheet.name());
        self.get(layout).ok()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Worksheet;

    #[test]
    fn test_detect_english_invoice_by_title() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set(1, 5, "INVOICE");
        assert_eq!(detect_layout(&sheet), Some(ENGLISH_INVOICE));
    }

    #[test]
    fn test_detect_by_column_names() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set(11, 2, "ITEM");
        sheet.set(11, 5, "Unit Cost (KRW)");
        sheet.set(11, 6, "TOTAL AMOUNT (KRW)");
        assert_eq!(detect_layout(&sheet), Some(QUOTATION));
    }

    #[test]
    fn test_detect_korean_layouts() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set(2, 15, "거 래 명 세 서");
        assert_eq!(detect_layout(&sheet), None);

        sheet.set(2, 15, "거래명세서 (공급받는자용)");
        assert_eq!(detect_layout(&sheet), Some(TRANSACTION_STATEMENT));

        let mut sheet = Worksheet::new("Sheet1");
        sheet.set(9, 2, "Category");
        assert_eq!(detect_layout(&sheet), Some(CATEGORY_QUOTATION));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.names().count(), 5);

        let template = registry.get(ENGLISH_INVOICE).unwrap();
        assert_eq!(template.summary["total_due"], CellRef::new(22, 5));
        let items = template.items.as_ref().unwrap();
        assert_eq!(items.header_row(), 11);
        assert_eq!(items.header_map().get(Field::Amount), Some(5));

        assert_eq!(
            registry.get("missing").unwrap_err(),
            ExtractionError::UnknownTemplate("missing".into())
        );
    }

    #[test]
    fn test_custom_template_replaces_builtin() {
        let custom: Template = serde_json::from_str(
            r#"{"name": "quotation", "header": {"client": "C3"}, "items": {"start_row": 8, "columns": {"description": "A", "amount": "D"}}}"#,
        )
        .unwrap();
        assert!(custom.validate().is_ok());

        let registry = TemplateRegistry::new().with_templates(vec![custom]);
        assert_eq!(registry.names().count(), 5);
        let template = registry.get(QUOTATION).unwrap();
        assert_eq!(template.header["client"], CellRef::new(3, 3));
        assert!(template.summary.is_empty());
    }
}
