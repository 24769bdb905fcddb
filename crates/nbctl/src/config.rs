//! Merges the config file with command-line flags into the settings for
//! one invocation. Flags win over the file, the file over defaults.

use clap::ValueEnum;

use nbctl_config::{Config, ConfigError, config_path, load_config_from};
use nbctl_core::{RunConfig, timeout_from_secs};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Everything `main` needs beyond the command batch itself.
#[derive(Debug)]
pub struct Settings {
    pub run: RunConfig,
    pub format: OutputFormat,
}

pub fn resolve(global: &GlobalOpts, batch: &[String]) -> Result<Settings, CliError> {
    let path = global.config.clone().unwrap_or_else(config_path);
    let file = load_config_from(&path).map_err(|e| CliError::config(e, &path))?;
    merge(global, &file, batch).map_err(|e| CliError::config(e, &path))
}

fn merge(global: &GlobalOpts, file: &Config, batch: &[String]) -> Result<Settings, ConfigError> {
    let format = match global.format {
        Some(format) => format,
        None => OutputFormat::from_str(&file.format, true).map_err(|reason| {
            ConfigError::Validation {
                field: "format".into(),
                reason,
            }
        })?,
    };

    let mut run = RunConfig::new(global.db.clone().unwrap_or_else(|| file.db.clone()))
        .with_comment_from_args(batch);
    run.dry_run = global.dry_run;
    run.oneline = global.oneline || file.oneline;
    run.timeout = timeout_from_secs(global.timeout.unwrap_or(file.timeout));

    Ok(Settings { run, format })
}
