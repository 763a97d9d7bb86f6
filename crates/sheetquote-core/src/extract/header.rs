//! Item table header detection.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::keywords::{match_field, normalize_label, Field};
use crate::models::config::HeaderScanConfig;
use crate::sheet::SheetView;

/// Mapping from semantic field to 1-based column index.
///
/// A field is bound at most once. Later bindings for an already bound
/// field are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderMap {
    columns: BTreeMap<Field, u32>,
}

impl HeaderMap {
    /// Bind a field to a column. Returns false if the field is already bound.
    pub fn bind(&mut self, field: Field, col: u32) -> bool {
        if self.columns.contains_key(&field) {
            return false;
        }
        self.columns.insert(field, col);
        true
    }

    /// Drop every other field bound to `col`.
    fn release_column(&mut self, col: u32, keep: Field) {
        self.columns.retain(|field, c| *c != col || *field == keep);
    }

    pub fn get(&self, field: Field) -> Option<u32> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, u32)> + '_ {
        self.columns.iter().map(|(f, c)| (*f, *c))
    }
}

/// Outcome of a header scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLocation {
    /// Header row, if one crossed the threshold.
    pub row: Option<u32>,
    /// Column mapping; empty when no header row was found.
    pub map: HeaderMap,
}

/// Finds the item table header row and maps its columns to fields.
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    first_row: u32,
    last_row: u32,
    min_fields: usize,
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self::from_config(&HeaderScanConfig::default())
    }
}

impl HeaderLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &HeaderScanConfig) -> Self {
        Self {
            first_row: config.first_row.max(1),
            last_row: config.last_row,
            min_fields: config.min_fields.max(1),
        }
    }

    /// Set the rows to scan (inclusive).
    pub fn with_scan_range(mut self, first_row: u32, last_row: u32) -> Self {
        self.first_row = first_row.max(1);
        self.last_row = last_row;
        self
    }

    /// Set the number of bound fields needed to accept a header row.
    pub fn with_min_fields(mut self, min_fields: usize) -> Self {
        self.min_fields = min_fields.max(1);
        self
    }

    pub fn scan_range(&self) -> (u32, u32) {
        (self.first_row, self.last_row)
    }

    /// Scan rows top-down. Bindings accumulate across rows (first match per
    /// field wins) and the first row after which the cumulative map reaches
    /// the threshold is the header row. A column bound in the current row
    /// releases fields bound to it by earlier rows.
    pub fn locate<S: SheetView + ?Sized>(&self, sheet: &S) -> HeaderLocation {
        let last_row = self.last_row.min(sheet.max_row());
        let mut map = HeaderMap::default();

        for row in self.first_row..=last_row {
            let mut bound_here = Vec::new();
            for col in 1..=sheet.max_column() {
                let normalized = normalize_label(&sheet.value(row, col).as_text());
                if let Some(field) = match_field(&normalized) {
                    if map.bind(field, col) {
                        debug!("Row {}: bound {} to column {}", row, field, col);
                        bound_here.push((field, col));
                    }
                }
            }
            for (field, col) in bound_here {
                map.release_column(col, field);
            }

            if map.len() >= self.min_fields {
                debug!("Header row {} with {} fields", row, map.len());
                return HeaderLocation { row: Some(row), map };
            }
        }

        HeaderLocation::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Worksheet;
    use pretty_assertions::assert_eq;

    fn quotation_sheet() -> Worksheet {
        let mut rows: Vec<Vec<&str>> = vec![vec![]; 9];
        rows.push(vec!["상세내역", "수량", "단가", "금액"]);
        rows.push(vec!["A", "", "", "500"]);
        rows.push(vec!["B", "2", "100", "200"]);
        rows.push(vec!["합계", "", "", "700"]);
        Worksheet::from_rows("견적서", rows)
    }

    #[test]
    fn test_locate_korean_header() {
        let location = HeaderLocator::new().locate(&quotation_sheet());

        assert_eq!(location.row, Some(10));
        assert_eq!(location.map.get(Field::Description), Some(1));
        assert_eq!(location.map.get(Field::Quantity), Some(2));
        assert_eq!(location.map.get(Field::UnitPrice), Some(3));
        assert_eq!(location.map.get(Field::Amount), Some(4));
    }

    #[test]
    fn test_first_qualifying_row_wins() {
        let sheet = Worksheet::from_rows(
            "Sheet1",
            vec![
                vec!["Quotation", "", ""],
                vec!["Description", "Qty", "Amount"],
                vec!["Item", "Quantity", "금액"],
            ],
        );
        let location = HeaderLocator::new().locate(&sheet);

        assert_eq!(location.row, Some(2));
        assert_eq!(location.map.len(), 3);
    }

    #[test]
    fn test_bindings_accumulate_across_rows() {
        let sheet = Worksheet::from_rows(
            "Sheet1",
            vec![vec!["", "비고"], vec!["", ""], vec!["품명", ""]],
        );
        let location = HeaderLocator::new().locate(&sheet);

        assert_eq!(location.row, Some(3));
        assert_eq!(location.map.get(Field::Remark), Some(2));
        assert_eq!(location.map.get(Field::Description), Some(1));
    }

    #[test]
    fn test_preamble_label_does_not_block_header_column() {
        let mut rows: Vec<Vec<&str>> = vec![vec![]; 9];
        rows[1] = vec!["", "", "", "Unit"];
        rows.push(vec!["Description", "Qty", "Unit Price", "Amount"]);
        rows.push(vec!["Speaker", "2", "100", "200"]);
        let sheet = Worksheet::from_rows("Sheet1", rows);

        let location = HeaderLocator::new().locate(&sheet);

        assert_eq!(location.row, Some(10));
        assert_eq!(location.map.get(Field::Amount), Some(4));
        assert_eq!(location.map.get(Field::Unit), None);
        assert_eq!(location.map.get(Field::Quantity), Some(2));
        assert_eq!(location.map.get(Field::UnitPrice), Some(3));
    }

    #[test]
    fn test_header_not_found() {
        let sheet = Worksheet::from_rows("Sheet1", vec![vec!["Quotation"], vec!["Description"]]);
        let location = HeaderLocator::new().locate(&sheet);
        assert_eq!(location, HeaderLocation::default());

        let location = HeaderLocator::new()
            .with_scan_range(11, 40)
            .locate(&quotation_sheet());
        assert_eq!(location.row, None);
    }

    #[test]
    fn test_merged_header_cells() {
        let mut sheet = Worksheet::from_rows("Sheet1", vec![vec!["DESCRIPTION", "", "", "Q'TY"]]);
        sheet.add_merge(crate::sheet::MergeRange::new(1, 1, 1, 3));
        let location = HeaderLocator::new().locate(&sheet);

        assert_eq!(location.row, Some(1));
        assert_eq!(location.map.get(Field::Description), Some(1));
        assert_eq!(location.map.get(Field::Quantity), Some(4));
    }
}
