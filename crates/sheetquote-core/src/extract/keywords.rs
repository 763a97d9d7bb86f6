//! Keyword tables shared by the header locator and the label scanners.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Semantic column of the item table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Description,
    UnitPrice,
    Quantity,
    Unit,
    Amount,
    Remark,
}

impl Field {
    /// All fields in header-scan order.
    pub const ALL: [Field; 6] = [
        Field::Description,
        Field::UnitPrice,
        Field::Quantity,
        Field::Unit,
        Field::Amount,
        Field::Remark,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Description => "description",
            Field::UnitPrice => "unit_price",
            Field::Quantity => "quantity",
            Field::Unit => "unit",
            Field::Amount => "amount",
            Field::Remark => "remark",
        }
    }

    /// Parse a field name, accepting the aliases found in older documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match normalize_label(name).as_str() {
            "description" | "item" | "품명" | "품목" => Some(Field::Description),
            "unitprice" | "unitkrw" | "unitcost" | "단가" => Some(Field::UnitPrice),
            "quantity" | "qty" | "수량" => Some(Field::Quantity),
            "unit" | "day" | "일수" | "단위" => Some(Field::Unit),
            "amount" | "amountkrw" | "totalamount" | "금액" => Some(Field::Amount),
            "remark" | "비고" => Some(Field::Remark),
            _ => None,
        }
    }

    /// Normalized header keywords for this field.
    pub fn keywords(&self) -> &'static [String] {
        FIELD_KEYWORDS
            .iter()
            .find(|(field, _)| field == self)
            .map(|(_, keywords)| keywords.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref NON_LABEL_CHARS: Regex = Regex::new(r"[^0-9a-z\p{Hangul}]").unwrap();

    /// Header keyword variants per field, normalized with [`normalize_label`].
    pub static ref FIELD_KEYWORDS: Vec<(Field, Vec<String>)> = vec![
        (Field::Description, normalized(&[
            "description", "item", "item name", "name",
            "품목", "품명", "항목", "항목명", "상세내역", "상 세 내 역", "세부내역",
        ])),
        (Field::UnitPrice, normalized(&[
            "단가", "unit cost", "unit price", "unit krw", "unit cost (krw)", "price",
        ])),
        (Field::Quantity, normalized(&["qty", "quantity", "quant", "수량"])),
        (Field::Unit, normalized(&["unit", "단위", "day", "days", "일수"])),
        (Field::Amount, normalized(&[
            "amount", "amount krw", "amount (krw)", "total amount", "total amount (krw)",
            "금액", "합계", "공급가액",
        ])),
        (Field::Remark, normalized(&["remark", "remarks", "note", "비고"])),
    ];

    /// Keywords marking a table row as a total/summary line rather than an item.
    pub static ref SUMMARY_ROW_KEYWORDS: Vec<String> =
        normalized(&["합계", "총액", "vat", "부가세", "참고", "소계", "tax", "total", "sum"]);
}

fn normalized(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| normalize_label(w)).collect()
}

/// Normalize label text for keyword comparison: lowercase, keeping only
/// ASCII alphanumerics and Hangul.
pub fn normalize_label(text: &str) -> String {
    NON_LABEL_CHARS
        .replace_all(&text.to_lowercase(), "")
        .into_owned()
}

/// Field whose keyword list contains the normalized text exactly.
pub fn match_field(normalized: &str) -> Option<Field> {
    if normalized.is_empty() {
        return None;
    }
    FIELD_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| k == normalized))
        .map(|(field, _)| *field)
}

/// True when the normalized text contains a summary-row keyword.
pub fn is_summary_text(normalized: &str) -> bool {
    SUMMARY_ROW_KEYWORDS
        .iter()
        .any(|k| normalized.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Unit Cost (KRW)"), "unitcostkrw");
        assert_eq!(normalize_label("상 세 내 역"), "상세내역");
        assert_eq!(normalize_label(" Q'TY\n"), "qty");
        assert_eq!(normalize_label("TOTAL Due:"), "totaldue");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_match_field() {
        assert_eq!(match_field("상세내역"), Some(Field::Description));
        assert_eq!(match_field("unitkrw"), Some(Field::UnitPrice));
        assert_eq!(match_field("unit"), Some(Field::Unit));
        assert_eq!(match_field("금액"), Some(Field::Amount));
        assert_eq!(match_field("수량"), Some(Field::Quantity));
        assert_eq!(match_field(""), None);
        assert_eq!(match_field("unitprice1"), None);
    }

    #[test]
    fn test_summary_text() {
        assert!(is_summary_text(&normalize_label("합 계")));
        assert!(is_summary_text(&normalize_label("VAT (10%)")));
        assert!(is_summary_text(&normalize_label("Sub Total")));
        assert!(!is_summary_text(&normalize_label("LED 스크린")));
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Field::UnitPrice.as_str(), "unit_price");
        assert_eq!(Field::from_name("unit_krw"), Some(Field::UnitPrice));
        assert_eq!(Field::from_name("amount_krw"), Some(Field::Amount));
        assert_eq!(Field::from_name("qty"), Some(Field::Quantity));
        assert!(Field::Quantity.keywords().contains(&"qty".to_string()));
    }
}
