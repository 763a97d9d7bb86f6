use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use sheetquote_core::{
    load_worksheet, CellValue, CleanValue, DocumentExtractor, ExtractionError, Items,
    SheetInvoiceParser, SheetView, WorkbookError,
};

fn write_quotation(path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("견적서")?;

    sheet.write_string(0, 0, "발급일")?;
    sheet.write_string(0, 1, "2025-05-20")?;
    sheet.merge_range(1, 0, 1, 1, "상호", &Format::new())?;
    sheet.write_string(1, 2, "(주)무대연출")?;

    sheet.write_string(5, 0, "상 세 내 역")?;
    sheet.write_string(5, 1, "수량")?;
    sheet.write_string(5, 2, "단가")?;
    sheet.write_string(5, 3, "금액")?;
    sheet.write_string(5, 4, "비고")?;

    sheet.write_string(6, 0, "음향")?;
    sheet.write_number(6, 3, 1_250_000.0)?;
    sheet.write_string(7, 0, "메인 스피커")?;
    sheet.write_number(7, 1, 4.0)?;
    sheet.write_string(7, 2, "250,000")?;
    sheet.write_number(7, 3, 1_000_000.0)?;
    sheet.write_string(8, 0, "믹서")?;
    sheet.write_number(8, 1, 1.0)?;
    sheet.write_number(8, 2, 250_000.0)?;
    sheet.write_number(8, 3, 250_000.0)?;
    sheet.write_string(8, 4, "디지털")?;

    sheet.write_string(9, 0, "조명")?;
    sheet.write_string(10, 0, "무빙 라이트")?;
    sheet.write_number(10, 1, 8.0)?;
    sheet.write_string(10, 2, "별도")?;

    sheet.write_string(12, 0, "합계")?;
    sheet.write_number(12, 3, 1_250_000.0)?;
    sheet.write_string(13, 0, "부가세")?;
    sheet.write_number(13, 3, 125_000.0)?;
    sheet.write_string(14, 0, "총액")?;
    sheet.write_number(14, 3, 1_375_000.0)?;

    workbook.save(path)
}

#[test]
fn test_extract_written_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quote.xlsx");
    write_quotation(&path).unwrap();

    let loaded = load_worksheet(&path).unwrap();
    assert_eq!(loaded.sheet.name(), "견적서");
    assert_eq!(loaded.sheet.value(2, 2), &CellValue::Text("상호".into()));

    let result = SheetInvoiceParser::new().extract_file(&path).unwrap();
    let doc = &result.document;

    assert_eq!(result.header_row, Some(6));
    assert_eq!(doc.meta.file_name, "quote.xlsx");
    assert_eq!(doc.meta.sheet_name.as_deref(), Some("견적서"));
    assert_eq!(doc.header["발급일"], CellValue::Text("2025-05-20".into()));
    assert_eq!(doc.header["상호"], CellValue::Text("(주)무대연출".into()));

    let Items::Grouped(groups) = &doc.items else {
        panic!("expected grouped items");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].category.as_deref(), Some("음향"));
    assert_eq!(groups[0].category_total, Some(CleanValue::Integer(1_250_000)));
    assert_eq!(groups[0].items[0].unit_price, Some(CleanValue::Integer(250_000)));
    assert_eq!(groups[0].items[1].remark.as_deref(), Some("디지털"));
    assert_eq!(groups[1].items[0].category.as_deref(), Some("조명"));

    assert_eq!(doc.summary["subtotal"], Some(CleanValue::Integer(1_250_000)));
    assert_eq!(doc.summary["tax_due"], Some(CleanValue::Integer(125_000)));
    assert_eq!(doc.summary["total_due"], Some(CleanValue::Integer(1_375_000)));

    assert_eq!(
        result.issues,
        vec![ExtractionError::ValueCoercion {
            row: 11,
            field: "unit_price".into(),
            value: "별도".into(),
        }]
    );
}

#[test]
fn test_not_a_workbook_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"not a zip archive").unwrap();

    let err = SheetInvoiceParser::new().extract_file(&path).unwrap_err();
    assert!(matches!(
        err,
        sheetquote_core::SheetQuoteError::Workbook(WorkbookError::Malformed { .. })
    ));
}
