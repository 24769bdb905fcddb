//! Configuration for the `nbctl` client.
//!
//! A `config.toml` in the platform config directory supplies defaults
//! for the database locator, timeout and output format. Values merge as
//! built-in defaults, then the TOML file, then `NBCTL_*` environment
//! variables. Command-line flags override all of these in the binary.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output formats accepted by `format` and `--format`.
pub const FORMATS: &[&str] = &["list", "table", "json", "json-compact", "yaml"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Database locator, `file:PATH` or `memory:`.
    #[serde(default = "default_db")]
    pub db: String,

    /// Seconds to wait before giving up; 0 waits forever.
    #[serde(default)]
    pub timeout: u64,

    /// Format for table results.
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default)]
    pub oneline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db: default_db(),
            timeout: 0,
            format: default_format(),
            oneline: false,
        }
    }
}

fn default_format() -> String {
    "list".into()
}

/// A JSON database under the platform data directory.
pub fn default_db() -> String {
    let path = ProjectDirs::from("org", "nbctl", "nbctl").map_or_else(
        || PathBuf::from("nb.json"),
        |dirs| dirs.data_dir().join("nb.json"),
    );
    format!("file:{}", path.display())
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !FORMATS.contains(&self.format.as_str()) {
            return Err(ConfigError::Validation {
                field: "format".into(),
                reason: format!("expected one of {}, got '{}'", FORMATS.join(", "), self.format),
            });
        }
        if self.db.is_empty() {
            return Err(ConfigError::Validation {
                field: "db".into(),
                reason: "database locator must not be empty".into(),
            });
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "nbctl", "nbctl").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("nbctl");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from `path` plus environment. A missing file only contributes
/// nothing.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NBCTL_"))
        .extract()?;
    config.validate()?;
    Ok(config)
}
