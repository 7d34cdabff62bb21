//! Open-Meteo forecast client
//!
//! Fetches the current reading and the hourly series for a coordinate pair and
//! reduces them to a single temperature/humidity observation.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Default host for the forecast API
pub const DEFAULT_FORECAST_BASE_URL: &str = "https://api.open-meteo.com";

/// Variables requested for both the current reading and the hourly series
const FORECAST_VARIABLES: &str = "temperature_2m,relative_humidity_2m,weather_code";

/// Errors that can occur when fetching forecast data
#[derive(Debug, Error)]
pub enum ForecastError {
    /// HTTP request failed, timed out, or returned a non-success status
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),
}

/// A single observation extracted from a forecast response
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReading {
    /// Temperature in Celsius, unclamped
    pub temperature_c: f64,
    /// Relative humidity percentage, unclamped
    pub humidity: f64,
    /// WMO weather code, if the provider sent one
    pub weather_code: Option<i64>,
    /// Local timestamp of the reading as sent by the provider
    pub observed_at: Option<String>,
}

/// Forecast API response structure
#[derive(Debug, Default, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    utc_offset_seconds: Option<i32>,
    #[serde(default)]
    current: Option<CurrentBlock>,
    #[serde(default)]
    hourly: Option<HourlyBlock>,
}

/// Current reading from Open-Meteo
#[derive(Debug, Default, Deserialize)]
struct CurrentBlock {
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    temperature_2m: Option<f64>,
    #[serde(default)]
    relative_humidity_2m: Option<f64>,
    #[serde(default)]
    weather_code: Option<f64>,
}

/// Hourly series from Open-Meteo; entries can be null
#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<f64>>,
}

/// Client for fetching forecast data from Open-Meteo
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: String,
    debug_raw: bool,
}

impl Default for ForecastClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastClient {
    /// Create a new ForecastClient against the public API
    pub fn new() -> Self {
        Self::with_client(Client::new(), DEFAULT_FORECAST_BASE_URL)
    }

    /// Create a new ForecastClient with a custom HTTP client and host
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            debug_raw: false,
        }
    }

    /// Log raw response bodies at debug level
    pub fn with_debug_raw(mut self, debug_raw: bool) -> Self {
        self.debug_raw = debug_raw;
        self
    }

    /// Fetch the current observation for the given coordinates
    ///
    /// # Arguments
    /// * `lat` - Latitude coordinate
    /// * `lon` - Longitude coordinate
    /// * `timeout` - Upper bound for the whole request; the request is aborted when it elapses
    ///
    /// # Returns
    /// * `Ok(ForecastReading)` - Temperature and humidity from `current`, or from the hourly series
    /// * `Err(ForecastError)` - If the request fails or neither block has both values
    pub async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
        timeout: Duration,
    ) -> Result<ForecastReading, ForecastError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let latitude = lat.to_string();
        let longitude = lon.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", FORECAST_VARIABLES),
                ("hourly", FORECAST_VARIABLES),
                ("timezone", "auto"),
            ])
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        if self.debug_raw {
            tracing::debug!(target: "cityweather::raw", lat, lon, body = %text, "forecast response");
        }

        let api_response: ForecastResponse = serde_json::from_str(&text)?;
        select_reading(api_response, Utc::now())
    }
}

/// Reduce a forecast response to one reading
///
/// Uses `current` when it has both temperature and humidity. Otherwise picks
/// the hourly entry whose timestamp equals `current.time` (or the top of the
/// present hour in the location's offset), defaulting to the first entry.
fn select_reading(
    response: ForecastResponse,
    now: DateTime<Utc>,
) -> Result<ForecastReading, ForecastError> {
    let current = response.current.unwrap_or_default();
    let current_code = current.weather_code.map(|code| code as i64);

    if let (Some(temperature_c), Some(humidity)) =
        (current.temperature_2m, current.relative_humidity_2m)
    {
        return Ok(ForecastReading {
            temperature_c,
            humidity,
            weather_code: current_code,
            observed_at: current.time,
        });
    }

    let hourly = response
        .hourly
        .ok_or_else(|| ForecastError::MissingField("hourly".to_string()))?;

    let target_time = current
        .time
        .clone()
        .unwrap_or_else(|| top_of_hour(now, response.utc_offset_seconds.unwrap_or(0)));
    let index = hourly
        .time
        .iter()
        .position(|time| *time == target_time)
        .unwrap_or(0);

    let temperature_c = hourly
        .temperature_2m
        .get(index)
        .copied()
        .flatten()
        .ok_or_else(|| ForecastError::MissingField("temperature_2m".to_string()))?;
    let humidity = hourly
        .relative_humidity_2m
        .get(index)
        .copied()
        .flatten()
        .ok_or_else(|| ForecastError::MissingField("relative_humidity_2m".to_string()))?;
    let weather_code = current_code.or_else(|| {
        hourly
            .weather_code
            .get(index)
            .copied()
            .flatten()
            .map(|code| code as i64)
    });

    Ok(ForecastReading {
        temperature_c,
        humidity,
        weather_code,
        observed_at: hourly.time.get(index).cloned().or(current.time),
    })
}

/// Format the start of the current hour the way the hourly series does
/// (`2024-07-15T14:00`), in the location's UTC offset
fn top_of_hour(now: DateTime<Utc>, utc_offset_seconds: i32) -> String {
    const HOUR_FORMAT: &str = "%Y-%m-%dT%H:00";

    match FixedOffset::east_opt(utc_offset_seconds) {
        Some(offset) => now.with_timezone(&offset).format(HOUR_FORMAT).to_string(),
        None => now.format(HOUR_FORMAT).to_string(),
    }
}
