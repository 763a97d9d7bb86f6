//! Export command - render a document as a table workbook.

use std::path::PathBuf;

use clap::Args;
use console::style;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use sheetquote_core::models::document::{FlatRow, LineItem};
use sheetquote_core::{CellValue, CleanValue, InvoiceDocument};

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Document JSON file
    #[arg(required = true)]
    input: PathBuf,

    /// Output workbook
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Worksheet name
    #[arg(long, default_value = "Quotation")]
    sheet_name: String,
}

const COLUMNS: [&str; 6] = ["Description", "Unit price", "Qty", "Unit", "Amount", "Remark"];

pub async fn run(args: ExportArgs) -> anyhow::Result<()> {
    let document = InvoiceDocument::from_file(&args.input)?;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&args.sheet_name)?;
    let rows = write_document(sheet, &document)?;

    workbook.save(&args.output)?;

    println!(
        "{} Wrote {} rows to {}",
        style("✓").green(),
        rows,
        args.output.display()
    );

    Ok(())
}

/// Lay out header pairs, the item table and the summary. Category rows are
/// written as `[name]`. Returns the number of rows used.
fn write_document(sheet: &mut Worksheet, document: &InvoiceDocument) -> Result<u32, XlsxError> {
    let bold = Format::new().set_bold();
    let mut row = 0u32;

    for (label, value) in &document.header {
        sheet.write_string_with_format(row, 0, label, &bold)?;
        write_cell_value(sheet, row, 1, value)?;
        row += 1;
    }
    if !document.header.is_empty() {
        row += 1;
    }

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *title, &bold)?;
    }
    row += 1;

    for entry in document.items.flat_rows() {
        match entry {
            FlatRow::Category(marker) => {
                sheet.write_string_with_format(row, 0, format!("[{}]", marker.name), &bold)?;
                write_clean_value(sheet, row, 4, &marker.category_total)?;
            }
            FlatRow::Item(item) => write_item(sheet, row, &item)?,
        }
        row += 1;
    }

    let summary: Vec<_> = document
        .summary
        .iter()
        .filter(|(_, value)| value.is_some())
        .collect();
    if !summary.is_empty() {
        row += 1;
        for (field, value) in summary {
            sheet.write_string_with_format(row, 3, field, &bold)?;
            write_clean_value(sheet, row, 4, value)?;
            row += 1;
        }
    }

    sheet.set_column_width(0, 40)?;
    Ok(row)
}

fn write_item(sheet: &mut Worksheet, row: u32, item: &LineItem) -> Result<(), XlsxError> {
    sheet.write_string(row, 0, &item.description)?;
    write_clean_value(sheet, row, 1, &item.unit_price)?;
    write_clean_value(sheet, row, 2, &item.quantity)?;
    if let Some(unit) = &item.unit {
        sheet.write_string(row, 3, unit)?;
    }
    write_clean_value(sheet, row, 4, &item.amount)?;
    if let Some(remark) = &item.remark {
        sheet.write_string(row, 5, remark)?;
    }
    Ok(())
}

fn write_clean_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Option<CleanValue>,
) -> Result<(), XlsxError> {
    match value {
        Some(CleanValue::Text(s)) => {
            sheet.write_string(row, col, s)?;
        }
        Some(number) => {
            if let Some(n) = number.as_f64() {
                sheet.write_number(row, col, n)?;
            }
        }
        None => {}
    }
    Ok(())
}

fn write_cell_value(sheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<(), XlsxError> {
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            sheet.write_number(row, col, *n)?;
        }
        CellValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        other => {
            sheet.write_string(row, col, other.as_text())?;
        }
    }
    Ok(())
}
