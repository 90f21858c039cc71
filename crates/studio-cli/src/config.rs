use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use studio_ledger::EngineConfig;
use studio_store::{FileStoreConfig, SyncMode};

/// Log file used when neither the config file nor `--store` names one.
pub const DEFAULT_STORE_PATH: &str = "studio.log";

/// Top-level configuration for the `studio` binary.
///
/// ```toml
/// [store]
/// path = "data/studio.log"
/// sync_mode = "every-write"
///
/// [engine]
/// lock_stripes = 16
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub store: StoreSection,
    pub engine: EngineConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
    pub sync_mode: SyncMode,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            sync_mode: SyncMode::default(),
        }
    }
}

impl StudioConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Build the effective configuration: file values first, then flags.
    pub fn resolve(config_path: Option<&Path>, store_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(store) = store_override {
            config.store.path = store.to_path_buf();
        }
        Ok(config)
    }

    pub fn file_store_config(&self) -> FileStoreConfig {
        FileStoreConfig {
            sync_mode: self.store.sync_mode,
        }
    }
}
