//! Classify command - detect workbook layouts and sort files by layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use glob::glob;
use tracing::{info, warn};

use sheetquote_core::{detect_layout, load_worksheet};

/// Folder name for workbooks with no known layout.
const UNKNOWN_LAYOUT: &str = "other";

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Copy each workbook into <output_dir>/<layout>/
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

pub async fn run(args: ClassifyArgs) -> anyhow::Result<()> {
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| super::is_workbook(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut failed = Vec::new();

    for path in &files {
        let loaded = match load_worksheet(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                failed.push((path, e.to_string()));
                continue;
            }
        };

        let layout = detect_layout(&loaded.sheet).unwrap_or(UNKNOWN_LAYOUT);
        *counts.entry(layout).or_default() += 1;
        println!("{:<24} {}", style(layout).cyan(), path.display());

        if let Some(output_dir) = &args.output_dir {
            let target_dir = output_dir.join(layout);
            fs::create_dir_all(&target_dir)?;
            let target = target_dir.join(loaded.file_name());
            fs::copy(path, &target)?;
            info!("Copied {} to {}", path.display(), target.display());
        }
    }

    println!();
    for (layout, count) in &counts {
        println!("{} {}: {}", style("ℹ").blue(), layout, count);
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Unreadable files:").red());
        for (path, reason) in &failed {
            println!("  - {}: {}", path.display(), reason);
        }
    }

    Ok(())
}
