//! Runtime configuration for the weather resolver
//!
//! Every setting has a hard-coded default. Missing or unparseable environment
//! values fall back to that default instead of failing.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::data::forecast::DEFAULT_FORECAST_BASE_URL;
use crate::data::geocode::DEFAULT_GEOCODING_BASE_URL;

/// Default cache TTL in seconds (10 minutes)
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 600;

/// Default bound on the live geocode + forecast lookup
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

pub const ENV_PROVIDER: &str = "WEATHER_PROVIDER";
pub const ENV_CACHE_TTL_SECONDS: &str = "WEATHER_CACHE_TTL_SECONDS";
pub const ENV_TIMEOUT_MS: &str = "WEATHER_TIMEOUT_MS";
pub const ENV_CACHE_DISABLED: &str = "WEATHER_CACHE_DISABLED";
pub const ENV_DEBUG_RAW: &str = "WEATHER_DEBUG_RAW";
pub const ENV_GEOCODING_URL: &str = "WEATHER_GEOCODING_URL";
pub const ENV_FORECAST_URL: &str = "WEATHER_FORECAST_URL";

/// Error types for configuration parsing
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The provider name is not recognized
    #[error("Invalid provider: '{0}'. Valid providers: auto, open-meteo, mock")]
    InvalidProvider(String),
}

/// Which weather source a call may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderSetting {
    /// Try the live provider, fall back to mock
    #[default]
    Auto,
    /// Prefer the live provider; failures still fall back to mock
    OpenMeteo,
    /// Never touch the network
    Mock,
}

impl ProviderSetting {
    /// Tag used in cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::OpenMeteo => "open-meteo",
            Self::Mock => "mock",
        }
    }

    /// Whether this setting permits a live lookup
    pub fn allows_live(&self) -> bool {
        !matches!(self, Self::Mock)
    }
}

impl fmt::Display for ProviderSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderSetting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "open-meteo" | "openmeteo" | "open_meteo" => Ok(Self::OpenMeteo),
            "mock" => Ok(Self::Mock),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

/// Settings read at call time
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub provider: ProviderSetting,
    pub cache_ttl_seconds: u64,
    pub timeout_ms: u64,
    pub cache_disabled: bool,
    /// Log raw upstream response bodies at debug level
    pub debug_raw: bool,
    pub geocoding_base_url: String,
    pub forecast_base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: ProviderSetting::Auto,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_disabled: false,
            debug_raw: false,
            geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
            forecast_base_url: DEFAULT_FORECAST_BASE_URL.to_string(),
        }
    }
}

impl WeatherConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = value(ENV_PROVIDER)
            .and_then(|v| match v.parse::<ProviderSetting>() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    tracing::warn!("{}, using default", e);
                    None
                }
            })
            .unwrap_or(defaults.provider);

        Self {
            provider,
            cache_ttl_seconds: value(ENV_CACHE_TTL_SECONDS)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_seconds),
            timeout_ms: value(ENV_TIMEOUT_MS)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            cache_disabled: value(ENV_CACHE_DISABLED)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.cache_disabled),
            debug_raw: value(ENV_DEBUG_RAW)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.debug_raw),
            geocoding_base_url: value(ENV_GEOCODING_URL).unwrap_or(defaults.geocoding_base_url),
            forecast_base_url: value(ENV_FORECAST_URL).unwrap_or(defaults.forecast_base_url),
        }
    }

    /// The live lookup deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Interpret an environment flag; anything unrecognized is off
fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
