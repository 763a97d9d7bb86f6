//! Label/value scanning for header and summary fields.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::keywords::normalize_label;
use super::normalize::clean_number;
use crate::models::config::{LabelConfig, SummaryLabel};
use crate::models::document::CleanValue;
use crate::sheet::{CellValue, SheetView};

/// Scan the header region for literal labels.
///
/// A label matches when the trimmed cell text, without a trailing colon,
/// equals it ignoring ASCII case. The value is the cell right of the label
/// (past the label's own merge), or the cell below when that is blank.
/// The first occurrence of each label wins.
pub fn scan_header_labels<S: SheetView + ?Sized>(
    sheet: &S,
    labels: &[String],
    region_rows: u32,
) -> BTreeMap<String, CellValue> {
    let mut header = BTreeMap::new();
    let last_row = region_rows.min(sheet.max_row());

    for row in 1..=last_row {
        for col in 1..=sheet.max_column() {
            let Some(text) = sheet.cell(row, col).and_then(|c| c.value.as_str()) else {
                continue;
            };
            let text = text.trim().trim_end_matches(':').trim_end();
            let Some(label) = labels
                .iter()
                .find(|l| l.trim().eq_ignore_ascii_case(text))
            else {
                continue;
            };
            if header.contains_key(label) {
                continue;
            }

            let (right_col, below_row) = match sheet.merge_at(row, col) {
                Some(m) => (m.max_col + 1, m.max_row + 1),
                None => (col + 1, row + 1),
            };
            let right = sheet.value(row, right_col);
            let value = if right.is_blank() {
                sheet.value(below_row, col)
            } else {
                right
            };

            debug!("Header label '{}' at row {} col {}: {}", label, row, col, value);
            header.insert(label.clone(), value.clone());
        }
    }

    header
}

/// Scans the sheet for summary labels such as subtotal and total due.
pub struct SummaryScanner<'a> {
    fields: Vec<(&'a str, Vec<String>)>,
    max_label_len: usize,
}

impl<'a> SummaryScanner<'a> {
    pub fn new(fields: &'a [SummaryLabel], max_label_len: usize) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|f| {
                    let keywords = f
                        .keywords
                        .iter()
                        .map(|k| normalize_label(k))
                        .filter(|k| !k.is_empty())
                        .collect();
                    (f.field.as_str(), keywords)
                })
                .collect(),
            max_label_len,
        }
    }

    pub fn from_config(config: &'a LabelConfig) -> Self {
        Self::new(&config.summary_fields, config.max_summary_label_len)
    }

    /// Field a label text belongs to: the one owning the longest keyword
    /// contained in the normalized text.
    pub fn attribute(&self, text: &str) -> Option<&'a str> {
        let normalized = normalize_label(text);
        if normalized.is_empty() || normalized.chars().count() > self.max_label_len {
            return None;
        }
        self.fields
            .iter()
            .flat_map(|(field, keywords)| keywords.iter().map(move |k| (*field, k)))
            .filter(|(_, k)| normalized.contains(k.as_str()))
            .max_by_key(|(_, k)| k.chars().count())
            .map(|(field, _)| field)
    }

    /// Scan every row except `excluded_rows`. Each configured field appears
    /// in the result, `None` when no label with a value was found. The first
    /// label (row-major) with a non-blank value to its right wins.
    pub fn scan<S: SheetView + ?Sized>(
        &self,
        sheet: &S,
        excluded_rows: &HashSet<u32>,
    ) -> BTreeMap<String, Option<CleanValue>> {
        let mut summary: BTreeMap<String, Option<CleanValue>> = self
            .fields
            .iter()
            .map(|(field, _)| (field.to_string(), None))
            .collect();
        let mut bound = HashSet::new();

        for row in 1..=sheet.max_row() {
            if excluded_rows.contains(&row) {
                continue;
            }
            for col in 1..=sheet.max_column() {
                let Some(text) = sheet.cell(row, col).and_then(|c| c.value.as_str()) else {
                    continue;
                };
                let Some(field) = self.attribute(text) else {
                    continue;
                };
                if bound.contains(field) {
                    continue;
                }

                let start = sheet.merge_at(row, col).map_or(col, |m| m.max_col) + 1;
                let value = (start..=sheet.max_column())
                    .map(|c| sheet.value(row, c))
                    .find(|v| !v.is_blank());
                if let Some(value) = value {
                    debug!("Summary '{}' at row {}: {}", field, row, value);
                    bound.insert(field);
                    summary.insert(field.to_string(), clean_number(value));
                }
            }
        }

        summary
    }
}

/// Read fixed cells of a template.
pub fn read_cells<S: SheetView + ?Sized>(
    sheet: &S,
    cells: &BTreeMap<String, crate::sheet::CellRef>,
) -> BTreeMap<String, CellValue> {
    cells
        .iter()
        .filter_map(|(key, cell)| {
            let value = sheet.value_at(*cell);
            (!value.is_blank()).then(|| (key.clone(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{MergeRange, Worksheet};
    use pretty_assertions::assert_eq;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_header_label_right_then_below() {
        let mut sheet = Worksheet::from_rows(
            "Sheet1",
            vec![
                vec!["DATE:", "2025-03-01", "", ""],
                vec!["SHIP TO", "", "", "QUOTATION #"],
                vec!["Seoul office", "", "", "Q-17"],
            ],
        );
        sheet.add_merge(MergeRange::new(2, 1, 2, 2));

        let header = scan_header_labels(
            &sheet,
            &labels(&["DATE", "SHIP TO", "QUOTATION #", "PO"]),
            15,
        );

        assert_eq!(header["DATE"], CellValue::Text("2025-03-01".into()));
        assert_eq!(header["SHIP TO"], CellValue::Text("Seoul office".into()));
        assert_eq!(header["QUOTATION #"], CellValue::Text("Q-17".into()));
        assert!(!header.contains_key("PO"));
    }

    #[test]
    fn test_header_labels_outside_region_are_ignored() {
        let sheet = Worksheet::from_rows("Sheet1", vec![vec![], vec![], vec!["상호", "ACME"]]);
        assert!(scan_header_labels(&sheet, &labels(&["상호"]), 2).is_empty());
        assert_eq!(scan_header_labels(&sheet, &labels(&["상호"]), 3).len(), 1);
    }

    #[test]
    fn test_summary_attribution() {
        let config = LabelConfig::default();
        let scanner = SummaryScanner::from_config(&config);

        assert_eq!(scanner.attribute("Sub total"), Some("subtotal"));
        assert_eq!(scanner.attribute("TOTAL Due"), Some("total_due"));
        assert_eq!(scanner.attribute("총 합계"), Some("total_due"));
        assert_eq!(scanner.attribute("합 계"), Some("subtotal"));
        assert_eq!(scanner.attribute("VAT (10%)"), Some("tax_due"));
        assert_eq!(scanner.attribute("Tax rate"), Some("tax_rate"));
        assert_eq!(scanner.attribute("LED screen"), None);
        assert_eq!(
            scanner.attribute("Total amount includes all on-site labour costs"),
            None
        );
    }

    #[test]
    fn test_summary_first_match_with_value_wins() {
        let sheet = Worksheet::from_rows(
            "Sheet1",
            vec![
                vec!["Description", "Qty", "Amount"],
                vec!["Sub total", "", "1,000"],
                vec!["Tax rate", "10%", ""],
                vec!["TOTAL Due", "", ""],
                vec!["TOTAL Due", "", "1,100"],
                vec!["Sub total", "", "9"],
            ],
        );
        let config = LabelConfig::default();
        let summary = SummaryScanner::from_config(&config).scan(&sheet, &HashSet::from([1]));

        assert_eq!(summary["subtotal"], Some(CleanValue::Integer(1000)));
        assert_eq!(summary["tax_rate"], Some(CleanValue::Text("10%".into())));
        assert_eq!(summary["total_due"], Some(CleanValue::Integer(1100)));
        assert_eq!(summary["other"], None);
        assert_eq!(summary.len(), 5);
    }

    #[test]
    fn test_excluded_rows_are_not_scanned() {
        let sheet = Worksheet::from_rows(
            "Sheet1",
            vec![vec!["품명", "합계", "비고"], vec!["합계", "700"]],
        );
        let config = LabelConfig::default();
        let summary = SummaryScanner::from_config(&config).scan(&sheet, &HashSet::from([1]));
        assert_eq!(summary["subtotal"], Some(CleanValue::Integer(700)));
    }

    #[test]
    fn test_read_cells() {
        let sheet = Worksheet::from_rows("Sheet1", vec![vec!["", "ACME"], vec!["", ""]]);
        let cells = BTreeMap::from([
            ("company".to_string(), crate::sheet::CellRef::new(1, 2)),
            ("date".to_string(), crate::sheet::CellRef::new(2, 2)),
        ]);
        let values = read_cells(&sheet, &cells);
        assert_eq!(values.len(), 1);
        assert_eq!(values["company"], CellValue::Text("ACME".into()));
    }
}
