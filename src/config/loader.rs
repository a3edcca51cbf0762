use super::MigrateConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "asana-migrate.toml";

pub struct ConfigLoader {
    working_dir: PathBuf,
    read_env: bool,
}

impl ConfigLoader {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            read_env: true,
        }
    }

    /// Skip environment overrides
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Load defaults, then the config file, then environment overrides.
    ///
    /// An explicitly requested file must exist. The default file is optional.
    pub async fn load(&self, explicit: Option<&Path>) -> Result<MigrateConfig> {
        let mut config = match explicit {
            Some(path) => {
                let path = self.resolve(path);
                if !fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(Error::Config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                self.load_file(&path).await?
            }
            None => {
                let path = self.working_dir.join(DEFAULT_CONFIG_FILE);
                if fs::try_exists(&path).await.unwrap_or(false) {
                    self.load_file(&path).await?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    MigrateConfig::default()
                }
            }
        };

        if self.read_env {
            config.merge_env_vars();
        }

        Ok(config)
    }

    async fn load_file(&self, path: &Path) -> Result<MigrateConfig> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_at(path, e))?;
        let config: MigrateConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}
