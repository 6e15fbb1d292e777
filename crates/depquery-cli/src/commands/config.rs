//! Config command - View the effective configuration

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use depquery_config::{ConfigLoader, DepQueryConfig};

/// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the merged configuration as TOML
    Show,

    /// Show configuration file paths
    Path,
}

/// Execute a config command
pub fn execute(cmd: ConfigCommand, config: DepQueryConfig, project_root: &Path) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let content =
                toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
            print!("{}", content);
        }
        ConfigCommand::Path => {
            let loader = ConfigLoader::new();
            match loader.global_config_path() {
                Some(path) => println!("global: {}", path.display()),
                None => println!("global: (no home directory)"),
            }
            println!("local: {}", loader.local_config_path(project_root).display());
        }
    }
    Ok(())
}
