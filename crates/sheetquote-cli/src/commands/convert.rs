//! Convert command - rewrite documents between flat and nested item lists.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::debug;

use sheetquote_core::{InvoiceDocument, Items};

/// Arguments for the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// Document JSON files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Target item representation
    #[arg(long, value_enum)]
    to: Representation,

    /// Do not keep a .bak copy of the original file
    #[arg(long)]
    no_backup: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Representation {
    /// Single list with category marker rows
    Flat,
    /// List of category groups
    Nested,
}

pub async fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let mut converted = 0;

    for path in &args.files {
        let mut document = InvoiceDocument::from_file(path)?;

        let already = matches!(
            (&document.items, args.to),
            (Items::Flat(_), Representation::Flat) | (Items::Grouped(_), Representation::Nested)
        );
        if already {
            println!("{} {} unchanged", style("-").dim(), path.display());
            continue;
        }

        document.items = match args.to {
            Representation::Flat => document.items.into_flat(),
            Representation::Nested => document.items.into_grouped(),
        };

        if !args.no_backup {
            let backup = backup_path(path);
            fs::copy(path, &backup)?;
            debug!("Backed up {} to {}", path.display(), backup.display());
        }

        document.save(path)?;
        converted += 1;
        println!("{} {}", style("✓").green(), path.display());
    }

    println!();
    println!(
        "{} Converted {} of {} files",
        style("ℹ").blue(),
        converted,
        args.files.len()
    );

    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("out/quote.json")),
            PathBuf::from("out/quote.json.bak")
        );
    }
}
