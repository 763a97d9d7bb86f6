//! Structured invoice/quotation document produced by extraction.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::sheet::{format_number, CellValue};

/// A cleaned numeric value, or the raw text when coercion failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CleanValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CleanValue {
    /// Convert back into a cell value.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            CleanValue::Integer(i) => CellValue::Number(*i as f64),
            CleanValue::Float(f) => CellValue::Number(*f),
            CleanValue::Text(s) => CellValue::from(s.as_str()),
        }
    }

    /// Numeric value as a decimal, if the value is numeric.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            CleanValue::Integer(i) => Some(Decimal::from(*i)),
            CleanValue::Float(f) => Decimal::from_f64(*f),
            CleanValue::Text(_) => None,
        }
    }

    /// Numeric value as a float, if the value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CleanValue::Integer(i) => Some(*i as f64),
            CleanValue::Float(f) => Some(*f),
            CleanValue::Text(_) => None,
        }
    }

    /// True when coercion failed and the raw text was kept.
    pub fn is_text(&self) -> bool {
        matches!(self, CleanValue::Text(_))
    }
}

impl std::fmt::Display for CleanValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanValue::Integer(i) => write!(f, "{}", i),
            CleanValue::Float(v) => f.write_str(&format_number(*v)),
            CleanValue::Text(s) => f.write_str(s),
        }
    }
}

/// A single line item of the item table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item description.
    pub description: String,

    /// Unit price.
    #[serde(default, alias = "unit_krw", alias = "unit_cost")]
    pub unit_price: Option<CleanValue>,

    /// Quantity.
    #[serde(default, alias = "qty")]
    pub quantity: Option<CleanValue>,

    /// Unit of measure or day count.
    #[serde(default, deserialize_with = "text_or_number")]
    pub unit: Option<String>,

    /// Line amount.
    #[serde(default, alias = "amount_krw", alias = "total_amount")]
    pub amount: Option<CleanValue>,

    /// Free-form remark.
    #[serde(default, deserialize_with = "text_or_number")]
    pub remark: Option<String>,

    /// Category the item belongs to, if the table is grouped.
    #[serde(default)]
    pub category: Option<String>,
}

/// Read a text field that older documents may store as a raw number
/// (`"unit": 3` for a day count).
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Bool(bool),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        },
        Raw::Bool(b) => b.to_string(),
    }))
}

/// A group of items under a category row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    /// Category name; `None` for items listed before the first category row.
    pub category: Option<String>,

    /// Total shown on the category row.
    #[serde(default)]
    pub category_total: Option<CleanValue>,

    /// Items of the category, in sheet order.
    pub items: Vec<LineItem>,
}

/// Category pseudo-row of a flat item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMarker {
    #[serde(rename = "__category__")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_total: Option<CleanValue>,
}

/// Entry of a flat item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatRow {
    Category(CategoryMarker),
    Item(LineItem),
}

/// Items of a document, either flat or grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Grouped(Vec<CategoryGroup>),
    Flat(Vec<FlatRow>),
}

impl Default for Items {
    fn default() -> Self {
        Items::Flat(Vec::new())
    }
}

impl Items {
    /// All line items in order, without category markers.
    pub fn line_items(&self) -> Vec<&LineItem> {
        match self {
            Items::Grouped(groups) => groups.iter().flat_map(|g| g.items.iter()).collect(),
            Items::Flat(rows) => rows
                .iter()
                .filter_map(|row| match row {
                    FlatRow::Item(item) => Some(item),
                    FlatRow::Category(_) => None,
                })
                .collect(),
        }
    }

    /// Number of line items.
    pub fn len(&self) -> usize {
        self.line_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into the flat representation.
    pub fn into_flat(self) -> Items {
        match self {
            Items::Grouped(groups) => Items::Flat(flatten(&groups)),
            flat => flat,
        }
    }

    /// Convert into the grouped representation.
    pub fn into_grouped(self) -> Items {
        match self {
            Items::Flat(rows) => Items::Grouped(unflatten(&rows)),
            grouped => grouped,
        }
    }

    /// Flat rows, computing them for grouped lists.
    pub fn flat_rows(&self) -> Vec<FlatRow> {
        match self {
            Items::Grouped(groups) => flatten(groups),
            Items::Flat(rows) => rows.clone(),
        }
    }

    /// Category groups, computing them for flat lists.
    pub fn groups(&self) -> Vec<CategoryGroup> {
        match self {
            Items::Grouped(groups) => groups.clone(),
            Items::Flat(rows) => unflatten(rows),
        }
    }
}

/// Flatten grouped items: each named category emits a marker row followed
/// by its items.
pub fn flatten(groups: &[CategoryGroup]) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    for group in groups {
        if let Some(name) = &group.category {
            rows.push(FlatRow::Category(CategoryMarker {
                name: name.clone(),
                category_total: group.category_total.clone(),
            }));
        }
        rows.extend(group.items.iter().cloned().map(FlatRow::Item));
    }
    rows
}

/// Group a flat list by its category markers. Items before the first
/// marker form a group without a category.
pub fn unflatten(rows: &[FlatRow]) -> Vec<CategoryGroup> {
    let mut groups = Vec::new();
    let mut current: Option<CategoryGroup> = None;

    for row in rows {
        match row {
            FlatRow::Category(marker) => {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
                current = Some(CategoryGroup {
                    category: Some(marker.name.clone()),
                    category_total: marker.category_total.clone(),
                    items: Vec::new(),
                });
            }
            FlatRow::Item(item) => current
                .get_or_insert_with(|| CategoryGroup {
                    category: None,
                    category_total: None,
                    items: Vec::new(),
                })
                .items
                .push(item.clone()),
        }
    }

    if let Some(group) = current {
        groups.push(group);
    }
    groups
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Source file name.
    pub file_name: String,

    /// Worksheet the document was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,

    /// Layout template that was detected or requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Row holding the item table header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_row: Option<u32>,
}

/// The extracted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub meta: DocumentMeta,

    /// Header label/value pairs (date, quotation number, ship-to, ...).
    #[serde(default)]
    pub header: BTreeMap<String, CellValue>,

    pub items: Items,

    /// Summary figures (subtotal, tax, total due, ...).
    #[serde(default)]
    pub summary: BTreeMap<String, Option<CleanValue>>,
}

impl InvoiceDocument {
    /// Load a document from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the document as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the document for internal inconsistencies.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.items.is_empty() {
            issues.push("No line items".to_string());
        }

        let tolerance = Decimal::new(1, 2);
        for group in self.items.groups() {
            let (Some(name), Some(total)) = (
                group.category.as_deref(),
                group.category_total.as_ref().and_then(CleanValue::as_decimal),
            ) else {
                continue;
            };
            if let Some(sum) = sum_amounts(group.items.iter()) {
                if (sum - total).abs() > tolerance {
                    issues.push(format!(
                        "Category '{}' total ({}) differs from sum of item amounts ({})",
                        name, total, sum
                    ));
                }
            }
        }

        let subtotal = self
            .summary
            .get("subtotal")
            .and_then(|v| v.as_ref())
            .and_then(CleanValue::as_decimal);
        if let (Some(subtotal), Some(sum)) = (subtotal, sum_amounts(self.items.line_items().into_iter())) {
            if (sum - subtotal).abs() > tolerance {
                issues.push(format!(
                    "Item amounts ({}) differ from summary subtotal ({})",
                    sum, subtotal
                ));
            }
        }

        let non_numeric = self
            .items
            .line_items()
            .iter()
            .filter(|item| {
                [&item.unit_price, &item.quantity, &item.amount]
                    .iter()
                    .any(|v| v.as_ref().is_some_and(CleanValue::is_text))
            })
            .count();
        if non_numeric > 0 {
            issues.push(format!("{} item(s) have non-numeric values kept as text", non_numeric));
        }

        issues
    }
}

fn sum_amounts<'a>(items: impl Iterator<Item = &'a LineItem>) -> Option<Decimal> {
    let amounts: Vec<Decimal> = items
        .filter_map(|item| item.amount.as_ref().and_then(CleanValue::as_decimal))
        .collect();
    (!amounts.is_empty()).then(|| amounts.into_iter().sum())
}
