//! Common test utilities and helpers

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated environment for driving the CLI binary
pub struct CliEnv {
    temp_dir: TempDir,
}

impl CliEnv {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Command with HOME and XDG dirs pointed into the temp dir, so no user
    /// config file is picked up
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("augmentflow").expect("binary builds");
        cmd.env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env_remove("AUGMENTFLOW_LOG_LEVEL")
            .env_remove("AUGMENTFLOW_DEFAULT_SEED")
            .env_remove("AUGMENTFLOW_RUN_TIMEOUT")
            .env_remove("AUGMENTFLOW_OUTPUT_DIR")
            .env_remove("AUGMENTFLOW_MAX_PROMPT_LENGTH");
        cmd
    }

    /// Write a config file and return its path
    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.path().join("augmentflow.toml");
        fs::write(&path, content).expect("write config");
        path
    }

    /// JSON files written into `dir`
    pub fn json_files(&self, dir: &Path) -> Vec<PathBuf> {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
