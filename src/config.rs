use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pds_registry_core::constraint::GroupConstraint;
use pds_registry_core::context::DEFAULT_LIMIT;
use pds_registry_core::pipeline::DEFAULT_MAX_LIMIT;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Named groups added to (or replacing) the built-in ones.
    #[serde(default)]
    pub groups: BTreeMap<String, GroupConstraint>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// JSON file holding an array of registry documents.
    pub path: PathBuf,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Only serve archived and certified products.
    #[serde(default = "default_archive_filter")]
    pub archive_filter: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            archive_filter: default_archive_filter(),
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}
fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}
fn default_archive_filter() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.index.timeout_ms == 0 {
        anyhow::bail!("index.timeout_ms must be > 0");
    }

    if config.registry.max_limit == 0 {
        anyhow::bail!("registry.max_limit must be > 0");
    }

    if config.registry.default_limit > config.registry.max_limit {
        anyhow::bail!(
            "registry.default_limit ({}) must not exceed registry.max_limit ({})",
            config.registry.default_limit,
            config.registry.max_limit
        );
    }

    for (name, group) in &config.groups {
        if name.trim().is_empty() {
            anyhow::bail!("group names must not be empty");
        }
        if group.is_empty() {
            anyhow::bail!("group '{}' has no all/any/not predicates", name);
        }
    }

    match config.log.level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => anyhow::bail!(
            "Unknown log level: '{}'. Must be trace, debug, info, warn, or error.",
            other
        ),
    }

    Ok(())
}
