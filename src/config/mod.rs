//! Configuration loading for recipevault.

use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::storage::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RECIPEVAULT_CONFIG";

/// Environment variable overriding the recipe root.
pub const ROOT_ENV: &str = "RECIPES_DIR";

/// Top-level configuration loaded from config.toml.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
}

/// Where the recipe tree lives.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_root")]
    pub root: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentsConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_root() -> String {
    "recipes".to_string()
}

fn default_limit() -> usize {
    50
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_ATTACHMENT_BYTES
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

impl Config {
    /// Load config from `$RECIPEVAULT_CONFIG` or
    /// `~/.config/recipevault/config.toml`, falling back to defaults, then
    /// apply `$RECIPES_DIR`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file named by `$RECIPEVAULT_CONFIG` is missing,
    /// or if a config file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(explicit) => Self::from_file(Path::new(&explicit))?,
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_root_override(std::env::var(ROOT_ENV).ok());
        Ok(config)
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "recipevault").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Replace the configured root when an override is present and non-empty.
    pub fn apply_root_override(&mut self, root: Option<String>) {
        if let Some(root) = root.filter(|r| !r.trim().is_empty()) {
            self.store.root = root;
        }
    }

    /// The recipe root with `~` expanded.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        expand_tilde(&self.store.root)
    }
}

/// Expand ~ to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(base_dirs) = BaseDirs::new()
    {
        return base_dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}
