//! Configuration loading for DuoDok.
//! Reads duodok.toml from the current directory or the path in DUODOK_CONFIG.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use duodok_docking::{StoreLayout, ToolchainConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub tools: ToolchainConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(flatten)]
    pub layout: StoreLayout,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_results_dir() -> PathBuf { PathBuf::from("results") }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            layout: StoreLayout::default(),
            results_dir: default_results_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Finished runs are copied here when set.
    pub outbox_dir: Option<PathBuf>,
}

mod tests;

impl Config {
    /// Load configuration from duodok.toml.
    /// Checks DUODOK_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DUODOK_CONFIG")
            .unwrap_or_else(|_| "duodok.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    /// A missing file gives the built-in defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(
                "Config file not found: {}; using built-in defaults. \
                 Copy duodok.example.toml to duodok.toml to customise.",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}
