//! Worksheet abstraction consumed by the extraction engine.
//!
//! Rows and columns are 1-based everywhere in this crate, matching how
//! spreadsheet users address cells (`A1` is row 1, column 1).

mod loader;
mod style;

pub use loader::{load_named_worksheet, load_worksheet, LoadedSheet};
pub use style::{apply_tint, StyleHints, DEFAULT_ACCENT_RGB};

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Raw value held by a worksheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// No value.
    #[default]
    Empty,
    /// Boolean value.
    Bool(bool),
    /// Numeric value (spreadsheets store integers as floats too).
    Number(f64),
    /// Text value.
    Text(String),
    /// Date/time value.
    DateTime(NaiveDateTime),
    /// Spreadsheet error value such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the value as display text. Integral numbers are printed
    /// without a fractional part.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::DateTime(dt) => {
                if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            CellValue::Error(e) => e.clone(),
        }
    }

    /// Text content, if the value is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

/// Format a float the way a spreadsheet shows it by default.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A single worksheet cell with optional presentation metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Cell value.
    pub value: CellValue,
    /// Presentation hints; opaque to the extraction engine.
    pub style: Option<StyleHints>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: StyleHints) -> Self {
        self.style = Some(style);
        self
    }
}

/// A merged cell range. All cells in the range read as the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

impl MergeRange {
    pub fn new(min_row: u32, min_col: u32, max_row: u32, max_col: u32) -> Self {
        Self {
            min_row: min_row.min(max_row),
            min_col: min_col.min(max_col),
            max_row: max_row.max(min_row),
            max_col: max_col.max(min_col),
        }
    }

    /// Parse an `A1:B2` range.
    pub fn parse(range: &str) -> Option<Self> {
        let (start, end) = range.split_once(':')?;
        let start = CellRef::parse(start)?;
        let end = CellRef::parse(end)?;
        Some(Self::new(start.row, start.col, end.row, end.col))
    }

    /// Check whether the range covers a cell.
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            CellRef::new(self.min_row, self.min_col),
            CellRef::new(self.max_row, self.max_col)
        )
    }
}

/// An `A1`-style cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a coordinate such as `E18` or `$AA$3`.
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        let col = column_index(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl Serialize for CellRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CellRef::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid cell reference: {s}")))
    }
}

/// Convert column letters (`A`, `Z`, `AA`) to a 1-based index.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Convert a 1-based column index to letters.
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

static EMPTY: CellValue = CellValue::Empty;

/// Read-only view over a worksheet.
pub trait SheetView {
    /// Worksheet name.
    fn name(&self) -> &str;

    /// Cell at a position, if one was stored.
    fn cell(&self, row: u32, col: u32) -> Option<&Cell>;

    /// Last row holding data.
    fn max_row(&self) -> u32;

    /// Last column holding data.
    fn max_column(&self) -> u32;

    /// Merged ranges.
    fn merges(&self) -> &[MergeRange];

    /// Merge range covering a cell, if any.
    fn merge_at(&self, row: u32, col: u32) -> Option<&MergeRange> {
        self.merges().iter().find(|m| m.contains(row, col))
    }

    /// Value at a position. Empty cells inside a merged range read as the
    /// range's top-left value.
    fn value(&self, row: u32, col: u32) -> &CellValue {
        if let Some(cell) = self.cell(row, col) {
            if cell.value != CellValue::Empty {
                return &cell.value;
            }
        }
        match self.merge_at(row, col) {
            Some(m) => self
                .cell(m.min_row, m.min_col)
                .map(|c| &c.value)
                .unwrap_or(&EMPTY),
            None => &EMPTY,
        }
    }

    /// Value at an `A1` coordinate.
    fn value_at(&self, cell: CellRef) -> &CellValue {
        self.value(cell.row, cell.col)
    }
}

/// An in-memory worksheet.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: HashMap<(u32, u32), Cell>,
    merges: Vec<MergeRange>,
    max_row: u32,
    max_col: u32,
}

impl Worksheet {
    /// Create an empty worksheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a worksheet from rows of values; the first row is row 1.
    pub fn from_rows<R, V>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut sheet = Self::new(name);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                sheet.set(r as u32 + 1, c as u32 + 1, value);
            }
        }
        sheet
    }

    /// Store a value. Empty values are not stored.
    pub fn set(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        self.set_cell(row, col, Cell::new(value));
    }

    /// Store a cell with its metadata.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        if row == 0 || col == 0 {
            return;
        }
        if cell.value == CellValue::Empty && cell.style.is_none() {
            self.cells.remove(&(row, col));
            return;
        }
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.cells.insert((row, col), cell);
    }

    /// Register a merged range.
    pub fn add_merge(&mut self, range: MergeRange) {
        self.max_row = self.max_row.max(range.max_row);
        self.max_col = self.max_col.max(range.max_col);
        self.merges.push(range);
    }

    /// Number of stored cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl SheetView for Worksheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    fn max_row(&self) -> u32 {
        self.max_row
    }

    fn max_column(&self) -> u32 {
        self.max_col
    }

    fn merges(&self) -> &[MergeRange] {
        &self.merges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_ref_parse() {
        assert_eq!(CellRef::parse("E18"), Some(CellRef::new(18, 5)));
        assert_eq!(CellRef::parse("$AA$3"), Some(CellRef::new(3, 27)));
        assert_eq!(CellRef::parse("a1"), Some(CellRef::new(1, 1)));
        assert_eq!(CellRef::parse("A0"), None);
        assert_eq!(CellRef::parse("12"), None);
        assert_eq!(CellRef::parse("E"), None);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(25), "Y");
        assert_eq!(column_index("W"), Some(23));
        assert_eq!(CellRef::new(45, 23).to_string(), "W45");
    }

    #[test]
    fn test_merged_value_resolves_to_top_left() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set(2, 1, "Merged title");
        sheet.add_merge(MergeRange::parse("A2:C3").unwrap());

        assert_eq!(sheet.value(3, 3), &CellValue::Text("Merged title".into()));
        assert_eq!(sheet.value(4, 3), &CellValue::Empty);
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.max_column(), 3);
    }

    #[test]
    fn test_blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("  \n".into()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert_eq!(CellValue::Number(500.0).as_text(), "500");
        assert_eq!(CellValue::Number(12.5).as_text(), "12.5");
    }

    #[test]
    fn test_from_rows_skips_empty_strings() {
        let sheet = Worksheet::from_rows("s", vec![vec!["a", ""], vec!["", "b"]]);
        assert_eq!(sheet.cell_count(), 2);
        assert_eq!(sheet.value(2, 2), &CellValue::Text("b".into()));
    }
}
