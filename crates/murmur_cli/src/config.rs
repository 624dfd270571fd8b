//! Murmur configuration file handling
//!
//! Settings live in `murmur.toml`:
//!
//! ```toml
//! [stores]
//! history_limit = 500
//!
//! [logging]
//! filter = "murmur_core=debug,info"
//! ```
//!
//! Every table and key is optional.

use anyhow::{Context, Result};
use murmur_core::StoresConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "murmur.toml";

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct MurmurConfig {
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `"murmur_core=trace,info"`
    #[serde(default)]
    pub filter: Option<String>,
}

impl MurmurConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `murmur.toml` in the working
    /// directory is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file {} does not exist", path.display());
                }
                Self::load_from_file(path)
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
