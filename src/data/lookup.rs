//! The live weather path: geocode the city, then fetch its forecast
//!
//! Both network calls run under a single deadline. Every failure, including the
//! deadline elapsing, comes back as a [`LookupError`] for the caller to absorb.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use thiserror::Error;
use tokio::time::Instant;

use super::forecast::{ForecastClient, ForecastError, ForecastReading};
use super::geocode::{GeocodeClient, GeocodeError};
use super::{
    clamp_humidity, clamp_temperature, CacheStatus, Condition, GeocodeInfo, SnapshotSource,
    WeatherSnapshot,
};
use crate::config::WeatherConfig;

/// Errors from the live lookup path
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Forecast failed: {0}")]
    Forecast(#[from] ForecastError),

    /// The geocode + forecast sequence did not finish in time
    #[error("Live lookup timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Failure reported by a non-HTTP lookup implementation
    #[error("Live lookup failed: {0}")]
    Other(String),
}

/// Result of a successful live lookup
#[derive(Debug, Clone, PartialEq)]
pub struct LiveObservation {
    pub geocode: GeocodeInfo,
    pub reading: ForecastReading,
}

impl LiveObservation {
    /// Convert into a clamped snapshot for the given normalized city
    pub fn into_snapshot(self, normalized_city: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            condition: Condition::from_weather_code(self.reading.weather_code),
            temperature_c: clamp_temperature(self.reading.temperature_c),
            humidity: clamp_humidity(self.reading.humidity),
            source: SnapshotSource::OpenMeteo,
            observed_at: self.reading.observed_at,
            cache_key: String::new(),
            cache_status: CacheStatus::Miss,
            normalized_city: normalized_city.to_string(),
            geocode: Some(self.geocode),
        }
    }
}

/// A source of live weather for a city
pub trait LiveLookup: Send + Sync {
    /// Resolve and fetch weather for `city`, giving up after `timeout`
    fn lookup<'a>(
        &'a self,
        city: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<LiveObservation, LookupError>>;
}

/// Live lookup against the Open-Meteo geocoding and forecast APIs
#[derive(Debug, Clone, Default)]
pub struct OpenMeteoLookup {
    geocoder: GeocodeClient,
    forecast: ForecastClient,
}

impl OpenMeteoLookup {
    pub fn new(geocoder: GeocodeClient, forecast: ForecastClient) -> Self {
        Self { geocoder, forecast }
    }

    /// Build clients for the hosts and raw-logging flag in `config`
    pub fn from_config(config: &WeatherConfig) -> Self {
        let client = Client::new();
        Self {
            geocoder: GeocodeClient::with_client(client.clone(), &config.geocoding_base_url)
                .with_debug_raw(config.debug_raw),
            forecast: ForecastClient::with_client(client, &config.forecast_base_url)
                .with_debug_raw(config.debug_raw),
        }
    }

    /// Run both calls, giving the forecast request only what is left of `budget`
    ///
    /// A forecast request that hits its own deadline reports the same
    /// [`LookupError::Timeout`] as the outer deadline would.
    async fn geocode_then_forecast(
        &self,
        city: &str,
        budget: Duration,
    ) -> Result<LiveObservation, LookupError> {
        let deadline = Instant::now().checked_add(budget);
        let geocode = self.geocoder.resolve(city, None).await?;

        let remaining = deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(budget);
        if remaining.is_zero() {
            return Err(LookupError::Timeout(budget));
        }

        let reading = self
            .forecast
            .fetch_forecast(geocode.latitude, geocode.longitude, remaining)
            .await
            .map_err(|e| match e {
                ForecastError::RequestFailed(ref err) if err.is_timeout() => {
                    LookupError::Timeout(budget)
                }
                e => LookupError::Forecast(e),
            })?;
        Ok(LiveObservation { geocode, reading })
    }
}

impl LiveLookup for OpenMeteoLookup {
    fn lookup<'a>(
        &'a self,
        city: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<LiveObservation, LookupError>> {
        Box::pin(async move {
            // Dropping the inner future on timeout aborts any in-flight request
            tokio::time::timeout(timeout, self.geocode_then_forecast(city, timeout))
                .await
                .map_err(|_| LookupError::Timeout(timeout))?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(temperature_c: f64, humidity: f64, code: Option<i64>) -> LiveObservation {
        LiveObservation {
            geocode: GeocodeInfo {
                name: "Beijing".to_string(),
                country: Some("China".to_string()),
                admin1: Some("Beijing".to_string()),
                latitude: 39.9,
                longitude: 116.4,
                timezone: Some("Asia/Shanghai".to_string()),
            },
            reading: ForecastReading {
                temperature_c,
                humidity,
                weather_code: code,
                observed_at: Some("2024-07-15T14:00".to_string()),
            },
        }
    }

    #[test]
    fn test_into_snapshot_maps_fields() {
        let snapshot = observation(24.3, 61.7, Some(2)).into_snapshot("beijing");

        assert_eq!(snapshot.condition, Condition::Cloudy);
        assert!((snapshot.temperature_c - 24.3).abs() < 0.01);
        assert_eq!(snapshot.humidity, 62);
        assert_eq!(snapshot.source, SnapshotSource::OpenMeteo);
        assert_eq!(snapshot.normalized_city, "beijing");
        assert_eq!(snapshot.observed_at.as_deref(), Some("2024-07-15T14:00"));
        assert_eq!(snapshot.geocode.map(|g| g.name), Some("Beijing".to_string()));
    }

    #[test]
    fn test_into_snapshot_clamps_out_of_range_values() {
        let snapshot = observation(45.0, 99.0, None).into_snapshot("turpan");

        assert_eq!(snapshot.temperature_c, 32.0);
        assert_eq!(snapshot.humidity, 85);
        assert_eq!(snapshot.condition, Condition::Unknown);
    }

    #[tokio::test]
    async fn test_forecast_request_deadline_reports_timeout() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    { "name": "Beijing", "country_code": "CN", "latitude": 39.9, "longitude": 116.4 }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let lookup = OpenMeteoLookup::from_config(&WeatherConfig {
            geocoding_base_url: server.uri(),
            forecast_base_url: server.uri(),
            ..WeatherConfig::default()
        });

        // No outer deadline here: only the request's own timeout can fire
        let budget = Duration::from_millis(200);
        let result = lookup.geocode_then_forecast("beijing", budget).await;

        assert!(
            matches!(result, Err(LookupError::Timeout(d)) if d == budget),
            "{:?}",
            result
        );
    }

    #[test]
    fn test_timeout_error_message() {
        let err = LookupError::Timeout(Duration::from_millis(4000));
        assert_eq!(err.to_string(), "Live lookup timed out after 4000ms");
    }
}
