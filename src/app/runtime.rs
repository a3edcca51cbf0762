//! Runtime initialization and command wiring
//!
//! Clients are built here from the loaded configuration and handed to the
//! exporter and importer; nothing reads credentials from anywhere else.

use crate::app::{config::AppConfig, logging::init_logging};
use crate::asana::AsanaClient;
use crate::config::{ConfigLoader, MigrateConfig};
use crate::export::{ExportSummary, Exporter, HttpDownloader};
use crate::import::{FaunaClient, ImportSummary, Importer};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Initialize the application with proper logging and configuration
pub fn initialize_app(config: &AppConfig) {
    init_logging(config);
}

/// Load the layered migration configuration for this process
pub async fn load_config(app: &AppConfig) -> Result<MigrateConfig> {
    let mut config = ConfigLoader::new(&app.working_dir)
        .load(app.config_file.as_deref())
        .await
        .context("Failed to load configuration")?;
    resolve_paths(&mut config, &app.working_dir);
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn resolve_paths(config: &mut MigrateConfig, working_dir: &Path) {
    if config.export.output_dir.is_relative() {
        config.export.output_dir = working_dir.join(&config.export.output_dir);
    }
    if config.import.data_dir.is_relative() {
        config.import.data_dir = working_dir.join(&config.import.data_dir);
    }
}

/// Export the configured workspace
pub async fn run_export(config: MigrateConfig) -> Result<ExportSummary> {
    config
        .validate_for_export()
        .context("Invalid export configuration")?;
    let workspace = config
        .asana
        .workspace
        .clone()
        .context("Asana workspace is not configured")?;

    let api = AsanaClient::new(&config.asana).context("Failed to create Asana client")?;
    let downloader = HttpDownloader::new().context("Failed to create downloader")?;
    let exporter = Exporter::new(api, downloader, config.export)?;

    let summary = exporter
        .export_workspace(&workspace)
        .await
        .with_context(|| format!("Export of workspace {} failed", workspace))?;
    Ok(summary)
}

/// Import exported tasks into Fauna
pub async fn run_import(config: MigrateConfig) -> Result<ImportSummary> {
    config
        .validate_for_import()
        .context("Invalid import configuration")?;

    let sink = FaunaClient::new(&config.import).context("Failed to create Fauna client")?;
    let data_dir = config.import.data_dir.clone();
    let importer = Importer::new(sink, config.import);

    let summary = importer
        .import_dir()
        .await
        .with_context(|| format!("Import from {} failed", data_dir.display()))?;
    Ok(summary)
}
