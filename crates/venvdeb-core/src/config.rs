//! Configuration file parsing and merging
//!
//! This module handles parsing of `venvdeb.toml` and `venvdeb.local.toml`
//! files. The local file overrides the base file per-key: tables are merged
//! recursively, arrays and primitives are replaced wholesale.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Main configuration structure for venvdeb
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Packaging settings
    pub package: PackageConfig,

    /// Publishing settings
    pub publish: PublishConfig,
}

/// Packaging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Root under which packages are installed (default: "/opt")
    pub prefix_root: Utf8PathBuf,

    /// Directory holding source distributions, relative to the environment
    /// root (default: "dist")
    pub dist_dir: Utf8PathBuf,

    /// Directory holding per-package hook scripts (default: "scripts")
    pub scripts_dir: Utf8PathBuf,

    /// License field passed to fpm (default: "Proprietary")
    pub license: String,

    /// Vendor field passed to fpm
    pub vendor: String,

    /// Maintainer used when the project does not declare one
    pub fallback_maintainer: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            prefix_root: Utf8PathBuf::from("/opt"),
            dist_dir: Utf8PathBuf::from("dist"),
            scripts_dir: Utf8PathBuf::from("scripts"),
            license: "Proprietary".to_string(),
            vendor: "internal".to_string(),
            fallback_maintainer: "unknown".to_string(),
        }
    }
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// SSH target of the repository host (e.g. "apt@repo.internal")
    pub host: String,

    /// Remote repository-administration command run before and after upload
    pub admin_command: String,

    /// Root of the package pool on the repository host (default: "pool")
    pub pool_root: Utf8PathBuf,

    /// Target architectures the pool is partitioned by
    pub architectures: Vec<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            host: "apt@repo.internal".to_string(),
            admin_command: "update-apt-repo".to_string(),
            pool_root: Utf8PathBuf::from("pool"),
            architectures: vec!["amd64".to_string(), "i386".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from a directory.
    ///
    /// This loads `venvdeb.toml` and optionally merges `venvdeb.local.toml`
    /// if it exists. Missing files yield the defaults.
    pub fn load(dir: &Utf8Path) -> Result<Self> {
        let config_path = dir.join("venvdeb.toml");
        let local_config_path = dir.join("venvdeb.local.toml");

        let base_config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<toml::Value>(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let local_config = if local_config_path.exists() {
            let content = std::fs::read_to_string(&local_config_path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        } else {
            None
        };

        let merged = if let Some(local) = local_config {
            merge_toml_values(base_config, local)
        } else {
            base_config
        };

        let config: Config = merged.try_into()?;

        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        // For arrays and primitives, local completely overrides base
        (_, local) => local,
    }
}
