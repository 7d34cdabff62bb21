//! Command-line interface parsing for the city weather resolver
//!
//! Flags given on the command line override the environment configuration.

use clap::Parser;
use thiserror::Error;

use crate::config::{ConfigError, ProviderSetting, WeatherConfig};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Look up the current weather for a city
#[derive(Parser, Debug)]
#[command(name = "cityweather")]
#[command(about = "Resolve a city to a cached, normalized weather snapshot")]
#[command(version)]
pub struct Cli {
    /// City name, optionally followed by a region (e.g. "Suzhou, Anhui")
    ///
    /// Multiple words are joined with spaces. Omitting the city resolves the
    /// placeholder "unknown".
    #[arg(value_name = "CITY")]
    pub city: Vec<String>,

    /// Weather source: auto, open-meteo, or mock
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Cache window length in seconds
    #[arg(long, value_name = "SECONDS")]
    pub ttl: Option<u64>,

    /// Deadline for the live geocode + forecast lookup
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Skip the cache entirely
    #[arg(long)]
    pub no_cache: bool,

    /// Log raw upstream responses at debug level (set RUST_LOG=debug to see them)
    #[arg(long)]
    pub debug_raw: bool,

    /// Keep the cache in memory instead of the user cache directory
    #[arg(long)]
    pub memory_cache: bool,

    /// Print the snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The city argument as a single string, if one was given
    pub fn city_arg(&self) -> Option<String> {
        if self.city.is_empty() {
            None
        } else {
            Some(self.city.join(" "))
        }
    }

    /// Apply command-line overrides on top of `base`
    ///
    /// # Returns
    /// * `Ok(WeatherConfig)` with the overrides applied
    /// * `Err(CliError)` if `--provider` names an unknown provider
    pub fn apply_to(&self, base: WeatherConfig) -> Result<WeatherConfig, CliError> {
        let mut config = base;

        if let Some(provider) = &self.provider {
            config.provider = provider.parse::<ProviderSetting>()?;
        }
        if let Some(ttl) = self.ttl {
            config.cache_ttl_seconds = ttl;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if self.no_cache {
            config.cache_disabled = true;
        }
        if self.debug_raw {
            config.debug_raw = true;
        }

        Ok(config)
    }
}
