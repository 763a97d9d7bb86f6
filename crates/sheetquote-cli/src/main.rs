//! CLI application for spreadsheet quotation/invoice extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, classify, config, convert, export, extract};

/// Spreadsheet quotation extractor - turn Korean/English invoice workbooks into structured JSON
#[derive(Parser)]
#[command(name = "sheetquote")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a single workbook
    Extract(extract::ExtractArgs),

    /// Extract multiple workbooks in parallel
    Batch(batch::BatchArgs),

    /// Detect the layout of workbooks and sort them by layout
    Classify(classify::ClassifyArgs),

    /// Convert documents between flat and nested item lists
    Convert(convert::ConvertArgs),

    /// Render a document as a table workbook
    Export(export::ExportArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Extract(args) => extract::run(args, cli.config.as_deref()).await,
        Commands::Batch(args) => batch::run(args, cli.config.as_deref()).await,
        Commands::Classify(args) => classify::run(args).await,
        Commands::Convert(args) => convert::run(args).await,
        Commands::Export(args) => export::run(args).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}
