use super::{get_config_dir, AugmentConfig};
use crate::error::{AugmentError, ErrorCode, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::fs;

/// Loads and holds the active configuration
pub struct ConfigLoader {
    config: Arc<RwLock<AugmentConfig>>,
    source: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AugmentConfig::new())),
            source: None,
        }
    }

    /// Load the per-user config file if it exists, then apply env overrides
    pub async fn load_default(&mut self) -> Result<()> {
        let path = get_config_dir()?.join("config.toml");
        if fs::try_exists(&path).await.unwrap_or(false) {
            self.load_file(&path).await?;
        } else {
            tracing::debug!(path = %path.display(), "No user config file, using defaults");
        }
        self.finish()
    }

    /// Load an explicit config file; a missing file is an error
    pub async fn load_from(&mut self, path: &Path) -> Result<()> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Err(AugmentError::configuration_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("Config file not found: {}", path.display()),
            ));
        }
        self.load_file(path).await?;
        self.finish()
    }

    async fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            AugmentError::configuration_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("Cannot read {}", path.display()),
            )
            .with_source(e)
        })?;
        let parsed = AugmentConfig::from_toml_str(&content)
            .map_err(|e| e.with_context(path.display()))?;

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = parsed;
        self.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        config.merge_env_vars();
        config.validate()
    }

    pub fn get_config(&self) -> AugmentConfig {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Path of the file the configuration came from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
