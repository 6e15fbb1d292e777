//! DepQuery CLI - Dependency Selector Syntax queries
//!
//! Runs CSS-like selectors against a dependency graph document.
//!
//! # Usage
//!
//! ```bash
//! # Direct dev dependencies of the project
//! depquery query ':root > .dev' --graph graph.json
//!
//! # Packages with install scripts, as JSON
//! depquery query ':scripts' --graph graph.json --archive archive.json -o json
//!
//! # Inspect how a selector parses
//! depquery parse ':root > :is(.prod, .peer)'
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// DepQuery - CSS-like selectors over dependency graphs
#[derive(Parser, Debug)]
#[command(name = "depquery")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "DEPQUERY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Default registry URL for `:outdated` and `:published`
    #[arg(long, global = true, env = "DEPQUERY_REGISTRY")]
    registry: Option<String>,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> depquery_config::ConfigOverrides {
        depquery_config::ConfigOverrides {
            registry_url: self.registry.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a selector against a dependency graph
    Query(commands::query::QueryArgs),

    /// Print the parsed selector tree as JSON
    Parse(commands::parse::ParseArgs),

    /// View configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let project_root = std::env::current_dir().context("Failed to get current directory")?;
    let config = commands::load_config(&cli.global, &project_root)?;

    // Flags win over the configured level
    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse::<Level>()
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Query(args) => commands::query::execute(args, cli.global, config).await,
        Commands::Parse(args) => commands::parse::execute(args),
        Commands::Config(cmd) => commands::config::execute(cmd, config, &project_root),
    }
}
