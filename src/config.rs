// Store and application configuration

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Longest todo text accepted by the general store
pub const DEFAULT_MAX_TEXT_LEN: usize = 500;

/// Longest todo text accepted when editing through the edit dialog
pub const EDIT_DIALOG_MAX_TEXT_LEN: usize = 100;

/// What an import does with records that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ImportPolicy {
    /// Skip invalid records and import the rest
    #[default]
    DropInvalid,
    /// Abort the whole import on the first invalid record
    RejectAll,
}

/// Library-level knobs for a `TodoStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub max_text_len: usize,
    pub import_policy: ImportPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            import_policy: ImportPolicy::default(),
        }
    }
}

/// Which backing store the CLI persists into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per key
    #[default]
    File,
    /// Single SQLite database
    Sqlite,
}

/// CLI configuration, read from `config.yml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the backing store (default: platform data dir)
    pub store_path: Option<PathBuf>,
    pub backend: Backend,
    pub max_text_len: usize,
    pub import_policy: ImportPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            backend: Backend::default(),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            import_policy: ImportPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: AppConfig = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_text_len: self.max_text_len,
            import_policy: self.import_policy,
        }
    }

    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(default_data_dir)
    }
}

/// Default configuration file location
/// Linux: ~/.config/glasstodo/config.yml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glasstodo")
        .join("config.yml")
}

/// Default backing store directory
/// Linux: ~/.local/share/glasstodo
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glasstodo")
}
