//! Migration configuration
//!
//! A [`MigrateConfig`] is built once at startup and handed to every
//! component that talks to Asana or Fauna. Values are layered, later
//! sources winning: built-in defaults, the TOML config file, environment
//! variables, then command-line flags.

use crate::concurrency::Concurrency;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub mod loader;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};

pub const ENV_ASANA_TOKEN: &str = "ASANA_TOKEN";
pub const ENV_ASANA_WORKSPACE: &str = "ASANA_WORKSPACE";
pub const ENV_ASANA_BASE_URL: &str = "ASANA_BASE_URL";
pub const ENV_FAUNA_SECRET: &str = "FAUNA_SECRET";
pub const ENV_FAUNA_ENDPOINT: &str = "FAUNA_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MigrateConfig {
    pub asana: AsanaConfig,
    pub export: ExportConfig,
    pub import: ImportConfig,
}

/// Access to the Asana REST API
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AsanaConfig {
    pub token: Option<String>,
    pub workspace: Option<String>,
    pub base_url: String,
    /// Records requested per page
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub project_concurrency: Concurrency,
    pub task_concurrency: Concurrency,
    pub attachment_concurrency: Concurrency,
    pub show_progress: bool,
}

/// Access to Fauna and where exported task files are read from
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    pub data_dir: PathBuf,
    pub secret: Option<String>,
    pub endpoint: String,
    pub collection: String,
    pub concurrency: Concurrency,
    pub recursive: bool,
}

impl Default for AsanaConfig {
    fn default() -> Self {
        Self {
            token: None,
            workspace: None,
            base_url: "https://app.asana.com/api/1.0".to_string(),
            page_size: 100,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            project_concurrency: Concurrency::SEQUENTIAL,
            task_concurrency: Concurrency::new(5).unwrap_or_default(),
            attachment_concurrency: Concurrency::new(5).unwrap_or_default(),
            show_progress: true,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            secret: None,
            endpoint: "https://db.fauna.com".to_string(),
            collection: "Task".to_string(),
            concurrency: Concurrency::SEQUENTIAL,
            recursive: false,
        }
    }
}

// Credentials never reach log output.
impl fmt::Debug for AsanaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsanaConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("workspace", &self.workspace)
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("data_dir", &self.data_dir)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("collection", &self.collection)
            .field("concurrency", &self.concurrency)
            .field("recursive", &self.recursive)
            .finish()
    }
}

impl MigrateConfig {
    pub fn merge_env_vars(&mut self) {
        self.merge_env_with(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides read through `lookup`
    pub fn merge_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = non_empty(ENV_ASANA_TOKEN) {
            self.asana.token = Some(token);
        }
        if let Some(workspace) = non_empty(ENV_ASANA_WORKSPACE) {
            self.asana.workspace = Some(workspace);
        }
        if let Some(base_url) = non_empty(ENV_ASANA_BASE_URL) {
            self.asana.base_url = base_url;
        }
        if let Some(secret) = non_empty(ENV_FAUNA_SECRET) {
            self.import.secret = Some(secret);
        }
        if let Some(endpoint) = non_empty(ENV_FAUNA_ENDPOINT) {
            self.import.endpoint = endpoint;
        }
    }

    /// Check that everything an export run needs is present
    pub fn validate_for_export(&self) -> Result<()> {
        if self.asana.token.is_none() {
            return Err(Error::Config(format!(
                "Asana access token is required (set {ENV_ASANA_TOKEN} or asana.token)"
            )));
        }
        if self.asana.workspace.is_none() {
            return Err(Error::Config(format!(
                "Asana workspace is required (set {ENV_ASANA_WORKSPACE}, asana.workspace or --workspace)"
            )));
        }
        if self.asana.page_size == 0 || self.asana.page_size > 100 {
            return Err(Error::Config(format!(
                "asana.page_size must be between 1 and 100, got {}",
                self.asana.page_size
            )));
        }
        url::Url::parse(&self.asana.base_url)?;
        Ok(())
    }

    /// Check that everything an import run needs is present
    pub fn validate_for_import(&self) -> Result<()> {
        if self.import.secret.is_none() {
            return Err(Error::Config(format!(
                "Fauna secret is required (set {ENV_FAUNA_SECRET} or import.secret)"
            )));
        }
        if self.import.collection.trim().is_empty() {
            return Err(Error::Config("import.collection must not be empty".to_string()));
        }
        url::Url::parse(&self.import.endpoint)?;
        Ok(())
    }
}
