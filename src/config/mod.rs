use crate::error::{AugmentError, ErrorCode, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;

pub use loader::ConfigLoader;

/// Get the per-user augmentflow configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("dev", "augmentflow", "augmentflow")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            AugmentError::configuration_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                "Could not determine home directory",
            )
        })
}

/// Top-level configuration, layered as defaults, then TOML file, then environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AugmentConfig {
    pub log_level: String,
    pub default_seed: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub pipeline: PipelineSettings,
    pub limits: Limits,
}

/// Timeouts applied by the orchestrator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineSettings {
    #[serde(with = "humantime_serde")]
    pub run_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub engine_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub hook_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub optional_stage_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub max_prompt_length: usize,
    pub max_image_dimension: u32,
    pub max_transforms: usize,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            default_seed: None,
            output_dir: None,
            pipeline: PipelineSettings::default(),
            limits: Limits::default(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(300),
            engine_timeout: Duration::from_secs(120),
            hook_timeout: Duration::from_secs(30),
            optional_stage_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_prompt_length: 10_000,
            max_image_dimension: 8192,
            max_transforms: 16,
        }
    }
}

impl AugmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AugmentConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `AUGMENTFLOW_*` environment overrides.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn merge_env_vars(&mut self) {
        self.merge_from(|key| std::env::var(key).ok());
    }

    fn merge_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("AUGMENTFLOW_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(seed) = lookup("AUGMENTFLOW_DEFAULT_SEED") {
            match seed.trim().parse::<u32>() {
                Ok(value) => self.default_seed = Some(value),
                Err(_) => tracing::warn!(value = %seed, "Ignoring invalid AUGMENTFLOW_DEFAULT_SEED"),
            }
        }

        if let Some(timeout) = lookup("AUGMENTFLOW_RUN_TIMEOUT") {
            match humantime_serde::re::humantime::parse_duration(timeout.trim()) {
                Ok(value) => self.pipeline.run_timeout = value,
                Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid AUGMENTFLOW_RUN_TIMEOUT"),
            }
        }

        if let Some(dir) = lookup("AUGMENTFLOW_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }

        if let Some(length) = lookup("AUGMENTFLOW_MAX_PROMPT_LENGTH") {
            match length.trim().parse::<usize>() {
                Ok(value) => self.limits.max_prompt_length = value,
                Err(_) => {
                    tracing::warn!(value = %length, "Ignoring invalid AUGMENTFLOW_MAX_PROMPT_LENGTH")
                }
            }
        }
    }

    /// Reject settings that would make every run fail
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("pipeline.run_timeout", self.pipeline.run_timeout),
            ("pipeline.engine_timeout", self.pipeline.engine_timeout),
            ("pipeline.hook_timeout", self.pipeline.hook_timeout),
            (
                "pipeline.optional_stage_timeout",
                self.pipeline.optional_stage_timeout,
            ),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(AugmentError::configuration_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("{} must be greater than zero", name),
                ));
            }
        }

        let limits = [
            ("limits.max_prompt_length", self.limits.max_prompt_length),
            (
                "limits.max_image_dimension",
                self.limits.max_image_dimension as usize,
            ),
            ("limits.max_transforms", self.limits.max_transforms),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(AugmentError::configuration_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("{} must be greater than zero", name),
                ));
            }
        }

        Ok(())
    }
}
