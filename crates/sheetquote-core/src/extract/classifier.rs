//! Row classification below the item table header.

use super::header::HeaderMap;
use super::keywords::{is_summary_text, normalize_label, Field};
use super::normalize::{clean_number, clean_text};
use crate::models::document::{CleanValue, LineItem};
use crate::sheet::{CellValue, SheetView};

/// Classification of one physical row.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedRow {
    /// Section title introducing the items that follow.
    Category {
        name: String,
        total: Option<CleanValue>,
    },
    /// A line item. `category` is left for the assembler to fill in.
    Item(LineItem),
    /// Blank, unmapped or summary row.
    Skip,
}

/// Lazily classifies every row from `header_row + 1` to the last row.
pub struct RowClassifier<'a, S: SheetView + ?Sized> {
    sheet: &'a S,
    map: &'a HeaderMap,
    next_row: u32,
    last_row: u32,
}

impl<'a, S: SheetView + ?Sized> RowClassifier<'a, S> {
    pub fn new(sheet: &'a S, header_row: u32, map: &'a HeaderMap) -> Self {
        Self {
            sheet,
            map,
            next_row: header_row + 1,
            last_row: sheet.max_row(),
        }
    }

    /// Classify a single row.
    pub fn classify(&self, row: u32) -> ClassifiedRow {
        let Some(description) = self
            .map
            .get(Field::Description)
            .and_then(|col| clean_text(self.sheet.value(row, col)))
        else {
            return ClassifiedRow::Skip;
        };

        if is_summary_text(&normalize_label(&description)) {
            return ClassifiedRow::Skip;
        }

        let amount = self.field_value(row, Field::Amount);
        let has_details = [Field::UnitPrice, Field::Quantity, Field::Unit, Field::Remark]
            .into_iter()
            .any(|field| !self.field_value(row, field).is_blank());

        if !has_details {
            return ClassifiedRow::Category {
                name: description,
                total: clean_number(amount),
            };
        }

        ClassifiedRow::Item(LineItem {
            description,
            unit_price: clean_number(self.field_value(row, Field::UnitPrice)),
            quantity: clean_number(self.field_value(row, Field::Quantity)),
            unit: clean_text(self.field_value(row, Field::Unit)),
            amount: clean_number(amount),
            remark: clean_text(self.field_value(row, Field::Remark)),
            category: None,
        })
    }

    /// Value of a mapped column. Cells covered by a merge that starts in
    /// another column read as blank, so a wide description does not spill
    /// into the numeric columns.
    fn field_value(&self, row: u32, field: Field) -> &'a CellValue {
        static BLANK: CellValue = CellValue::Empty;

        let Some(col) = self.map.get(field) else {
            return &BLANK;
        };
        match self.sheet.merge_at(row, col) {
            Some(merge) if merge.min_col != col => &BLANK,
            _ => self.sheet.value(row, col),
        }
    }
}

impl<'a, S: SheetView + ?Sized> Iterator for RowClassifier<'a, S> {
    type Item = (u32, ClassifiedRow);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row > self.last_row {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;
        Some((row, self.classify(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::header::HeaderLocator;
    use crate::sheet::{MergeRange, Worksheet};
    use pretty_assertions::assert_eq;

    fn classify_all(sheet: &Worksheet) -> Vec<(u32, ClassifiedRow)> {
        let location = HeaderLocator::new().locate(sheet);
        let row = location.row.expect("header row");
        RowClassifier::new(sheet, row, &location.map).collect()
    }

    #[test]
    fn test_category_item_and_total_rows() {
        let mut rows: Vec<Vec<&str>> = vec![vec![]; 9];
        rows.push(vec!["상세내역", "수량", "단가", "금액"]);
        rows.push(vec!["A", "", "", "500"]);
        rows.push(vec!["B", "2", "100", "200"]);
        rows.push(vec!["합계", "", "", "700"]);
        let sheet = Worksheet::from_rows("Sheet1", rows);

        let classified = classify_all(&sheet);
        assert_eq!(
            classified,
            vec![
                (
                    11,
                    ClassifiedRow::Category {
                        name: "A".into(),
                        total: Some(CleanValue::Integer(500)),
                    }
                ),
                (
                    12,
                    ClassifiedRow::Item(LineItem {
                        description: "B".into(),
                        quantity: Some(CleanValue::Integer(2)),
                        unit_price: Some(CleanValue::Integer(100)),
                        amount: Some(CleanValue::Integer(200)),
                        ..LineItem::default()
                    })
                ),
                (13, ClassifiedRow::Skip),
            ]
        );
    }

    #[test]
    fn test_summary_rows_are_skipped() {
        let sheet = Worksheet::from_rows(
            "Sheet1",
            vec![
                vec!["Description", "Qty", "Amount"],
                vec!["Sub Total", "", "1,000"],
                vec!["VAT 10%", "", "100"],
                vec!["", "3", "300"],
            ],
        );
        let kinds: Vec<_> = classify_all(&sheet).into_iter().map(|(_, c)| c).collect();
        assert_eq!(kinds, vec![ClassifiedRow::Skip; 3]);
    }

    #[test]
    fn test_description_only_is_category() {
        let sheet = Worksheet::from_rows(
            "Sheet1",
            vec![vec!["품명", "수량", "비고"], vec!["무대 장비", "", ""]],
        );
        assert_eq!(
            classify_all(&sheet)[0].1,
            ClassifiedRow::Category {
                name: "무대 장비".into(),
                total: None,
            }
        );
    }

    #[test]
    fn test_item_keeps_unparsable_values() {
        let sheet = Worksheet::from_rows(
            "Sheet1",
            vec![
                vec!["Item", "Unit Price", "Qty", "Unit", "Remark"],
                vec!["Operator", "별도", "2", "days", "on site"],
            ],
        );
        let ClassifiedRow::Item(item) = &classify_all(&sheet)[0].1 else {
            panic!("expected item");
        };
        assert_eq!(item.unit_price, Some(CleanValue::Text("별도".into())));
        assert_eq!(item.unit.as_deref(), Some("days"));
        assert_eq!(item.remark.as_deref(), Some("on site"));
        assert_eq!(item.amount, None);
    }

    #[test]
    fn test_wide_description_merge_does_not_fill_numbers() {
        let mut sheet = Worksheet::from_rows(
            "Sheet1",
            vec![vec!["Description", "Qty", "Amount"], vec!["Lighting", "", ""]],
        );
        sheet.add_merge(MergeRange::new(2, 1, 2, 2));
        assert!(matches!(
            classify_all(&sheet)[0].1,
            ClassifiedRow::Category { .. }
        ));
    }

    #[test]
    fn test_item_amount_under_preamble_unit_label() {
        let mut rows: Vec<Vec<&str>> = vec![vec![]; 9];
        rows[1] = vec!["", "", "", "Unit"];
        rows.push(vec!["Description", "Qty", "Unit Price", "Amount"]);
        rows.push(vec!["Speaker", "2", "100", "200"]);
        let sheet = Worksheet::from_rows("Sheet1", rows);

        assert_eq!(
            classify_all(&sheet),
            vec![(
                11,
                ClassifiedRow::Item(LineItem {
                    description: "Speaker".into(),
                    quantity: Some(CleanValue::Integer(2)),
                    unit_price: Some(CleanValue::Integer(100)),
                    amount: Some(CleanValue::Integer(200)),
                    ..LineItem::default()
                })
            )]
        );
    }
}
