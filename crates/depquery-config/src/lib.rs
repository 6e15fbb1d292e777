//! DepQuery Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.depquery/config.toml`
//! - Local config: `.depquery/config.toml` (in the project)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use depquery_core::{SpecOptions, DEFAULT_REGISTRY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration for DepQuery.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DepQueryConfig {
    /// Registry resolution and metadata fetching
    pub registry: RegistryConfig,

    /// Selector evaluation
    pub query: QueryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Registry configuration.
///
/// # Example TOML
///
/// ```toml
/// [registry]
/// url = "https://registry.npmjs.org/"
/// retries = 3
/// retry_delay_ms = 500
/// timeout_secs = 30
///
/// [registry.aliases]
/// corp = "https://npm.corp.example/"
///
/// [registry.git_hosts]
/// forge = "https://forge.example/$1/$2"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Default registry URL
    pub url: String,

    /// Maximum retries for a failed metadata request
    pub retries: u32,

    /// First backoff delay; doubled on each retry
    pub retry_delay_ms: u64,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Named registries (`alias -> url`)
    pub aliases: BTreeMap<String, String>,

    /// Extra git host templates, on top of the built-in ones
    pub git_hosts: BTreeMap<String, String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY.to_string(),
            aliases: BTreeMap::new(),
            git_hosts: BTreeMap::new(),
            retries: 3,
            retry_delay_ms: 500,
            timeout_secs: 30,
        }
    }
}

impl RegistryConfig {
    /// Provenance options for the query engine.
    pub fn spec_options(&self) -> SpecOptions {
        let mut options = SpecOptions::default().with_registry(self.url.clone());
        for (alias, url) in &self.aliases {
            options = options.with_alias(alias.clone(), url.clone());
        }
        options.git_hosts.extend(self.git_hosts.clone());
        options
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate URLs and limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.url) {
            return Err(ConfigError::invalid_value(
                "registry.url",
                format!("'{}' is not an http(s) URL", self.url),
            ));
        }
        for (alias, url) in &self.aliases {
            if !is_http_url(url) {
                return Err(ConfigError::invalid_value(
                    format!("registry.aliases.{}", alias),
                    format!("'{}' is not an http(s) URL", url),
                ));
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "registry.timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Selector evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Unknown or invalid selectors match nothing instead of failing
    pub loose: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override default registry URL
    pub registry_url: Option<String>,

    /// Override retry count
    pub retries: Option<u32>,

    /// Override loose mode
    pub loose: Option<bool>,

    /// Override log level
    pub log_level: Option<String>,
}

impl DepQueryConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref url) = overrides.registry_url {
            self.registry.url = url.clone();
        }

        if let Some(retries) = overrides.retries {
            self.registry.retries = retries;
        }

        if let Some(loose) = overrides.loose {
            self.query.loose = loose;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry.validate()
    }
}
