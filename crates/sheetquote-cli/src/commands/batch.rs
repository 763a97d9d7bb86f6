//! Batch processing command for multiple workbooks.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use sheetquote_core::{DocumentExtractor, ExtractionResult, SheetInvoiceParser};

use super::extract::{format_document, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write items as flat lists with category markers
    #[arg(long)]
    flat: bool,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of workbooks processed at once (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Exit successfully even if some files failed
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileOutcome {
    path: PathBuf,
    result: Result<ExtractionResult, String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| super::is_workbook(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    let jobs = args.jobs.unwrap_or(config.batch.jobs).max(1);
    let continue_on_error = args.continue_on_error || config.batch.continue_on_error;

    println!(
        "{} Found {} files to process ({} at a time)",
        style("ℹ").blue(),
        files.len(),
        jobs
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let output_names = output_names(&files);

    let parser = Arc::new(SheetInvoiceParser::from_config(&config));
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();

    for path in files {
        tasks.spawn(process_file(path, Arc::clone(&parser), Arc::clone(&semaphore)));
    }

    // Collected in completion order
    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                if let Err(e) = &outcome.result {
                    warn!("Failed to process {}: {}", outcome.path.display(), e);
                }
                outcomes.push(outcome);
            }
            Err(e) => error!("Worker task failed: {}", e),
        }
        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        for outcome in &outcomes {
            let Ok(result) = &outcome.result else {
                continue;
            };
            let mut document = result.document.clone();
            if args.flat {
                document.items = document.items.into_flat();
            }

            let name = output_names
                .get(&outcome.path)
                .cloned()
                .unwrap_or_else(|| file_stem(&outcome.path));
            let output_path = output_dir.join(format!("{}.{}", name, args.format.extension()));
            fs::write(&output_path, format_document(&document, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.result.is_err()).collect();
    let successful = outcomes.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            println!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.result.as_ref().err().map(String::as_str).unwrap_or("unknown error")
            );
        }

        if !continue_on_error {
            anyhow::bail!("{} of {} files failed", failed.len(), outcomes.len());
        }
    }

    Ok(())
}

/// Extract one workbook once a worker slot is free. Extraction runs on the
/// blocking pool.
async fn process_file(
    path: PathBuf,
    parser: Arc<SheetInvoiceParser>,
    semaphore: Arc<Semaphore>,
) -> FileOutcome {
    let file_start = Instant::now();

    let result = async {
        let _permit = semaphore.acquire_owned().await?;
        let task_path = path.clone();
        let result = tokio::task::spawn_blocking(move || parser.extract_file(&task_path)).await??;
        anyhow::Ok(result)
    }
    .await
    .map_err(|e| e.to_string());

    FileOutcome {
        path,
        result,
        processing_time_ms: file_start.elapsed().as_millis() as u64,
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Output base name per input file. Files sharing a stem are told apart
/// by their extension (`quote_xls`), then by a counter (`quote_xlsx_2`).
fn output_names(files: &[PathBuf]) -> HashMap<PathBuf, String> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for path in files {
        *stem_counts.entry(file_stem(path)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    let mut names = HashMap::new();
    for path in files {
        let stem = file_stem(path);
        let mut name = stem.clone();
        if stem_counts[&stem] > 1 {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                name = format!("{}_{}", stem, ext.to_lowercase());
            }
        }
        let base = name.clone();
        let mut n = 2;
        while !taken.insert(name.clone()) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        if name != stem {
            warn!(
                "Output name '{}' is shared; writing {} as '{}'",
                stem,
                path.display(),
                name
            );
        }
        names.insert(path.clone(), name);
    }
    names
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "template",
        "header_row",
        "items",
        "subtotal",
        "total_due",
        "issues",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &outcome.result {
            Ok(result) => {
                let document = &result.document;
                let summary_value = |field: &str| {
                    document
                        .summary
                        .get(field)
                        .and_then(|v| v.as_ref())
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                };
                wtr.write_record([
                    filename,
                    if result.is_partial() { "partial" } else { "success" },
                    result.template.as_deref().unwrap_or(""),
                    &result.header_row.map(|r| r.to_string()).unwrap_or_default(),
                    &document.items.len().to_string(),
                    &summary_value("subtotal"),
                    &summary_value("total_due"),
                    &result.issues.len().to_string(),
                    &outcome.processing_time_ms.to_string(),
                    "",
                ])?;
            }
            Err(e) => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &outcome.processing_time_ms.to_string(),
                    e,
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names_disambiguate_shared_stems() {
        let files: Vec<PathBuf> = ["a/quote.xlsx", "a/quote.xls", "b/quote.xlsx", "a/other.xlsx"]
            .iter()
            .map(PathBuf::from)
            .collect();

        let names = output_names(&files);

        assert_eq!(names[&files[0]], "quote_xlsx");
        assert_eq!(names[&files[1]], "quote_xls");
        assert_eq!(names[&files[2]], "quote_xlsx_2");
        assert_eq!(names[&files[3]], "other");
        let unique: HashSet<&String> = names.values().collect();
        assert_eq!(unique.len(), files.len());
    }
}
