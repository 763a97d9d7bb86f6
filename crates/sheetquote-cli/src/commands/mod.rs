pub mod batch;
pub mod classify;
pub mod config;
pub mod convert;
pub mod export;
pub mod extract;

use std::path::Path;

use sheetquote_core::ExtractConfig;
use tracing::debug;

/// Load the configuration from an explicit path, else from the default
/// location when it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ExtractConfig> {
    if let Some(path) = config_path {
        return Ok(ExtractConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(ExtractConfig::from_file(&default_path)?)
    } else {
        Ok(ExtractConfig::default())
    }
}

/// Spreadsheet extensions accepted by the workbook loader.
pub fn is_workbook(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(
        ext.to_lowercase().as_str(),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods"
    )
}
