//! CLI command implementations

pub mod config;
pub mod parse;
pub mod query;

use std::path::Path;

use anyhow::{Context, Result};
use depquery_config::{ConfigLoader, DepQueryConfig};

use crate::GlobalOptions;

/// Load configuration with optional config file override.
pub fn load_config(global: &GlobalOptions, project_root: &Path) -> Result<DepQueryConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    let config = match global.config {
        Some(ref config_path) => loader
            .load_file(config_path, Some(&overrides))
            .context("Failed to load config file")?,
        None => loader
            .load(project_root, Some(&overrides))
            .context("Failed to load configuration")?,
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
