//! Application configuration, read from a RON file.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use examscan_core::DEFAULT_AUTO_DISMISS_MS;
use examscan_engine::WorkerCommand;
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "examscan.ron";

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogDestination {
    /// Write to terminal (stderr/stdout).
    #[default]
    Terminal,
    /// Write to ./examscan.log in current directory.
    File,
    /// Write to both file and terminal.
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub worker: WorkerCommand,
    pub download_dir: PathBuf,
    pub log: LogDestination,
    pub notification_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker: WorkerCommand::default(),
            download_dir: PathBuf::from("downloads"),
            log: LogDestination::default(),
            notification_ms: DEFAULT_AUTO_DISMISS_MS,
        }
    }
}

impl AppConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
