//! Extract command - extract a document from a single workbook.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use sheetquote_core::models::document::{FlatRow, InvoiceDocument, Items, LineItem};
use sheetquote_core::sheet::load_named_worksheet;
use sheetquote_core::{load_worksheet, CleanValue, DocumentExtractor, SheetInvoiceParser};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input workbook (xlsx, xlsm, xlsb, xls, ods)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Worksheet to read (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Use a named template instead of detecting the layout
    #[arg(short, long)]
    template: Option<String>,

    /// Write items as a flat list with category markers
    #[arg(long)]
    flat: bool,

    /// Validate extracted data
    #[arg(long)]
    validate: bool,

    /// Show extraction issues and timing
    #[arg(long)]
    show_issues: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV of line items
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );

    pb.set_message("Loading workbook...");
    let loaded = match &args.sheet {
        Some(name) => load_named_worksheet(&args.input, name)?,
        None => load_worksheet(&args.input)?,
    };
    debug!("Workbook sheets: {:?}", loaded.sheet_names);

    pb.set_message("Extracting document...");
    let mut parser = SheetInvoiceParser::from_config(&config);
    if let Some(name) = &args.template {
        parser = parser.with_template(name.as_str());
    }
    let result = parser.extract(&loaded.sheet, &loaded.file_name());

    pb.finish_and_clear();

    let mut document = result.document;
    if args.flat {
        document.items = document.items.into_flat();
    }

    if args.validate {
        let issues = document.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_document(&document, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_issues {
        eprintln!();
        for issue in &result.issues {
            eprintln!("{} {}", style("⚠").yellow(), issue);
        }
        if let Some(template) = &result.template {
            eprintln!("{} Template: {}", style("ℹ").blue(), template);
        }
        eprintln!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            result.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render a document in the requested format.
pub fn format_document(document: &InvoiceDocument, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(document.to_json_pretty()?),
        OutputFormat::Csv => format_csv(document),
        OutputFormat::Text => Ok(format_text(document)),
    }
}

fn value_text(value: &Option<CleanValue>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn format_csv(document: &InvoiceDocument) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "category",
        "description",
        "unit_price",
        "quantity",
        "unit",
        "amount",
        "remark",
    ])?;

    for item in document.items.line_items() {
        wtr.write_record([
            item.category.as_deref().unwrap_or(""),
            &item.description,
            &value_text(&item.unit_price),
            &value_text(&item.quantity),
            item.unit.as_deref().unwrap_or(""),
            &value_text(&item.amount),
            item.remark.as_deref().unwrap_or(""),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_item(output: &mut String, item: &LineItem, indent: &str) {
    output.push_str(&format!("{}- {}", indent, item.description));
    if let Some(quantity) = &item.quantity {
        output.push_str(&format!(" x{}", quantity));
    }
    if let Some(unit) = &item.unit {
        output.push_str(&format!(" {}", unit));
    }
    if let Some(price) = &item.unit_price {
        output.push_str(&format!(" @ {}", price));
    }
    if let Some(amount) = &item.amount {
        output.push_str(&format!(" = {}", amount));
    }
    if let Some(remark) = &item.remark {
        output.push_str(&format!(" ({})", remark));
    }
    output.push('\n');
}

fn format_text(document: &InvoiceDocument) -> String {
    let mut output = String::new();

    output.push_str(&format!("File: {}\n", document.meta.file_name));
    if let Some(template) = &document.meta.template {
        output.push_str(&format!("Template: {}\n", template));
    }
    output.push('\n');

    if !document.header.is_empty() {
        output.push_str("Header:\n");
        for (label, value) in &document.header {
            output.push_str(&format!("  {}: {}\n", label, value));
        }
        output.push('\n');
    }

    output.push_str(&format!("Items ({}):\n", document.items.len()));
    match &document.items {
        Items::Grouped(groups) => {
            for group in groups {
                let indent = match &group.category {
                    Some(name) => {
                        output.push_str(&format!("  [{}]", name));
                        if let Some(total) = &group.category_total {
                            output.push_str(&format!(" {}", total));
                        }
                        output.push('\n');
                        "    "
                    }
                    None => "  ",
                };
                for item in &group.items {
                    format_item(&mut output, item, indent);
                }
            }
        }
        Items::Flat(rows) => {
            for row in rows {
                match row {
                    FlatRow::Category(marker) => {
                        output.push_str(&format!("  [{}]\n", marker.name));
                    }
                    FlatRow::Item(item) => format_item(&mut output, item, "  "),
                }
            }
        }
    }

    let summary: Vec<_> = document
        .summary
        .iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| (field, v)))
        .collect();
    if !summary.is_empty() {
        output.push_str("\nSummary:\n");
        for (field, value) in summary {
            output.push_str(&format!("  {}: {}\n", field, value));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetquote_core::models::document::CategoryGroup;

    fn document() -> InvoiceDocument {
        let mut doc = InvoiceDocument::default();
        doc.meta.file_name = "quote.xlsx".into();
        doc.items = Items::Grouped(vec![CategoryGroup {
            category: Some("음향".into()),
            category_total: Some(CleanValue::Integer(300)),
            items: vec![LineItem {
                description: "Speaker, main".into(),
                quantity: Some(CleanValue::Integer(2)),
                amount: Some(CleanValue::Float(300.5)),
                category: Some("음향".into()),
                ..LineItem::default()
            }],
        }]);
        doc.summary.insert("total_due".into(), Some(CleanValue::Integer(330)));
        doc
    }

    #[test]
    fn test_format_csv() {
        let csv = format_csv(&document()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "category,description,unit_price,quantity,unit,amount,remark");
        assert_eq!(lines[1], "음향,\"Speaker, main\",,2,,300.5,");
    }

    #[test]
    fn test_format_text() {
        let text = format_text(&document());
        assert!(text.contains("  [음향] 300\n"));
        assert!(text.contains("    - Speaker, main x2 = 300.5\n"));
        assert!(text.contains("total_due: 330"));
    }
}
