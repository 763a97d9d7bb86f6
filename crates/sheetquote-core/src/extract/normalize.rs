//! Cell value coercion.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::models::document::CleanValue;
use crate::sheet::CellValue;

/// Coerce a raw cell value into a number.
///
/// Blank input yields `None`. Thousands separators are stripped before
/// parsing. Integral values come back as integers, others are rounded to two
/// decimal places. Anything that does not parse is passed through unchanged
/// as text so it can be reviewed by hand.
pub fn clean_number(raw: &CellValue) -> Option<CleanValue> {
    match raw {
        CellValue::Empty => None,
        CellValue::Number(n) => Some(from_float(*n).unwrap_or_else(|| CleanValue::Text(n.to_string()))),
        CellValue::Bool(b) => Some(CleanValue::Integer(i64::from(*b))),
        CellValue::Text(s) => {
            if s.trim().is_empty() {
                return None;
            }
            Some(parse_number(s).unwrap_or_else(|| CleanValue::Text(s.clone())))
        }
        other => Some(CleanValue::Text(other.as_text())),
    }
}

/// Same coercion applied to an already-cleaned value.
pub fn clean_value(value: &CleanValue) -> Option<CleanValue> {
    clean_number(&value.to_cell_value())
}

/// Parse text with optional thousands separators.
pub fn parse_number(text: &str) -> Option<CleanValue> {
    let stripped = text.trim().replace(',', "");
    let parsed: f64 = stripped.parse().ok()?;
    from_float(parsed)
}

fn from_float(n: f64) -> Option<CleanValue> {
    if !n.is_finite() {
        return None;
    }
    if let Some(i) = as_integer(n) {
        return Some(CleanValue::Integer(i));
    }

    let rounded = Decimal::from_f64(n)
        .and_then(|d| d.round_dp(2).to_string().parse::<f64>().ok())
        .unwrap_or(n);

    Some(match as_integer(rounded) {
        Some(i) => CleanValue::Integer(i),
        None => CleanValue::Float(rounded),
    })
}

fn as_integer(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() < 9.0e18).then_some(n as i64)
}

/// Clean free text such as item descriptions: collapses line breaks,
/// non-breaking spaces and runs of whitespace. Blank input yields `None`.
pub fn clean_text(raw: &CellValue) -> Option<String> {
    if raw.is_blank() {
        return None;
    }
    let text = raw.as_text().replace('\u{00a0}', " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}
