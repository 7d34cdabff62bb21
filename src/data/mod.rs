//! Core data models for the city weather resolver
//!
//! This module contains the snapshot type returned to callers along with the
//! components that produce it: input normalization, geocoding, forecast
//! fetching, and the deterministic mock generator.

pub mod forecast;
pub mod geocode;
pub mod lookup;
pub mod mock;
pub mod normalize;

pub use forecast::{ForecastClient, ForecastError, ForecastReading};
pub use geocode::{GeocodeCandidate, GeocodeClient, GeocodeError};
pub use lookup::{LiveLookup, LiveObservation, LookupError, OpenMeteoLookup};
pub use mock::generate_mock;
pub use normalize::normalize_city;

use serde::{Deserialize, Serialize};

/// Lowest temperature (Celsius) a snapshot may report
pub const TEMPERATURE_MIN_C: f64 = 8.0;

/// Highest temperature (Celsius) a snapshot may report
pub const TEMPERATURE_MAX_C: f64 = 32.0;

/// Lowest relative humidity percentage a snapshot may report
pub const HUMIDITY_MIN: u8 = 30;

/// Highest relative humidity percentage a snapshot may report
pub const HUMIDITY_MAX: u8 = 85;

/// Weather condition labels exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Clear,
    Cloudy,
    Overcast,
    LightRain,
    LightSnow,
    Showers,
    SnowShowers,
    Fog,
    Unknown,
}

impl Condition {
    /// Map a WMO weather code to a condition label
    ///
    /// The thresholds are inclusive upper bounds checked in ascending order:
    /// - 0: clear
    /// - up to 3: cloudy
    /// - 4-48: overcast (includes fog codes 45 and 48)
    /// - 49-67: light rain
    /// - 68-77: light snow
    /// - 78-82: showers
    /// - 83-86: snow showers
    /// - anything else, including a missing code: unknown
    pub fn from_weather_code(code: Option<i64>) -> Self {
        const THRESHOLDS: [(i64, Condition); 6] = [
            (3, Condition::Cloudy),
            (48, Condition::Overcast),
            (67, Condition::LightRain),
            (77, Condition::LightSnow),
            (82, Condition::Showers),
            (86, Condition::SnowShowers),
        ];

        let Some(code) = code else {
            return Condition::Unknown;
        };
        if code == 0 {
            return Condition::Clear;
        }
        THRESHOLDS
            .iter()
            .find(|(upper, _)| code <= *upper)
            .map(|(_, condition)| *condition)
            .unwrap_or(Condition::Unknown)
    }

    /// The label as it appears in serialized snapshots
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Overcast => "overcast",
            Self::LightRain => "light-rain",
            Self::LightSnow => "light-snow",
            Self::Showers => "showers",
            Self::SnowShowers => "snow-showers",
            Self::Fog => "fog",
            Self::Unknown => "unknown",
        }
    }
}

/// Where the weather values in a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotSource {
    /// Live geocode + forecast lookup against Open-Meteo
    OpenMeteo,
    /// Deterministic values derived from the city name
    Mock,
}

impl SnapshotSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenMeteo => "open-meteo",
            Self::Mock => "mock",
        }
    }
}

/// How the current call obtained its snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the snapshot cache
    Hit,
    /// Computed and written to the snapshot cache
    #[default]
    Miss,
    /// Caching disabled for this call
    Bypass,
}

impl CacheStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

/// Resolved location metadata, present only when the live path succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeInfo {
    pub name: String,
    pub country: Option<String>,
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
}

/// A normalized weather result for one city
///
/// `cache_key`, `normalized_city` and `cache_status` describe the call that
/// produced this value. They are overwritten by the service on every call, so
/// stored payloads may omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub condition: Condition,
    pub temperature_c: f64,
    pub humidity: u8,
    pub source: SnapshotSource,
    /// ISO-8601 timestamp of the underlying observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<String>,
    #[serde(default)]
    pub cache_key: String,
    #[serde(default)]
    pub cache_status: CacheStatus,
    #[serde(default)]
    pub normalized_city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocode: Option<GeocodeInfo>,
}

impl WeatherSnapshot {
    /// Returns the snapshot with temperature and humidity forced into range
    pub fn clamped(mut self) -> Self {
        self.temperature_c = clamp_temperature(self.temperature_c);
        self.humidity = self.humidity.clamp(HUMIDITY_MIN, HUMIDITY_MAX);
        self
    }
}

/// Clamp a temperature reading to the reportable range
///
/// A NaN reading collapses to the lower bound.
pub fn clamp_temperature(celsius: f64) -> f64 {
    if celsius.is_nan() {
        return TEMPERATURE_MIN_C;
    }
    celsius.clamp(TEMPERATURE_MIN_C, TEMPERATURE_MAX_C)
}

/// Round a raw humidity reading and clamp it to the reportable range
pub fn clamp_humidity(percent: f64) -> u8 {
    if percent.is_nan() {
        return HUMIDITY_MIN;
    }
    percent
        .round()
        .clamp(f64::from(HUMIDITY_MIN), f64::from(HUMIDITY_MAX)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            condition: Condition::Cloudy,
            temperature_c: 21.5,
            humidity: 60,
            source: SnapshotSource::OpenMeteo,
            observed_at: Some("2024-07-15T14:00".to_string()),
            cache_key: "weather:v1:auto:beijing:1".to_string(),
            cache_status: CacheStatus::Miss,
            normalized_city: "beijing".to_string(),
            geocode: None,
        }
    }

    #[test]
    fn test_weather_code_mapping() {
        assert_eq!(Condition::from_weather_code(Some(0)), Condition::Clear);

        assert_eq!(Condition::from_weather_code(Some(1)), Condition::Cloudy);
        assert_eq!(Condition::from_weather_code(Some(3)), Condition::Cloudy);

        assert_eq!(Condition::from_weather_code(Some(4)), Condition::Overcast);
        assert_eq!(Condition::from_weather_code(Some(45)), Condition::Overcast);
        assert_eq!(Condition::from_weather_code(Some(48)), Condition::Overcast);

        assert_eq!(Condition::from_weather_code(Some(49)), Condition::LightRain);
        assert_eq!(Condition::from_weather_code(Some(61)), Condition::LightRain);
        assert_eq!(Condition::from_weather_code(Some(67)), Condition::LightRain);

        assert_eq!(Condition::from_weather_code(Some(71)), Condition::LightSnow);
        assert_eq!(Condition::from_weather_code(Some(77)), Condition::LightSnow);

        assert_eq!(Condition::from_weather_code(Some(80)), Condition::Showers);
        assert_eq!(Condition::from_weather_code(Some(82)), Condition::Showers);

        assert_eq!(Condition::from_weather_code(Some(85)), Condition::SnowShowers);
        assert_eq!(Condition::from_weather_code(Some(86)), Condition::SnowShowers);

        // Thunderstorms and anything past the table fall through
        assert_eq!(Condition::from_weather_code(Some(95)), Condition::Unknown);
        assert_eq!(Condition::from_weather_code(Some(99)), Condition::Unknown);
        assert_eq!(Condition::from_weather_code(None), Condition::Unknown);
        assert_eq!(Condition::from_weather_code(Some(87)), Condition::Unknown);
    }

    #[test]
    fn test_condition_serializes_as_label() {
        let json = serde_json::to_string(&Condition::SnowShowers).unwrap();
        assert_eq!(json, "\"snow-showers\"");
        assert_eq!(Condition::LightRain.label(), "light-rain");

        let parsed: Condition = serde_json::from_str("\"light-snow\"").unwrap();
        assert_eq!(parsed, Condition::LightSnow);
    }

    #[test]
    fn test_snapshot_json_field_names() {
        let json = serde_json::to_value(sample_snapshot()).unwrap();

        assert_eq!(json["temperatureC"], 21.5);
        assert_eq!(json["humidity"], 60);
        assert_eq!(json["source"], "open-meteo");
        assert_eq!(json["cacheStatus"], "miss");
        assert_eq!(json["normalizedCity"], "beijing");
        assert_eq!(json["observedAt"], "2024-07-15T14:00");
        assert!(json.get("geocode").is_none());
    }

    #[test]
    fn test_snapshot_payload_without_call_fields_parses() {
        let payload = r#"{
            "condition": "fog",
            "temperatureC": 12.0,
            "humidity": 80,
            "source": "mock"
        }"#;

        let snapshot: WeatherSnapshot = serde_json::from_str(payload).expect("Failed to parse");
        assert_eq!(snapshot.condition, Condition::Fog);
        assert_eq!(snapshot.source, SnapshotSource::Mock);
        assert!(snapshot.cache_key.is_empty());
        assert!(snapshot.normalized_city.is_empty());
        assert!(snapshot.observed_at.is_none());
    }

    #[test]
    fn test_clamp_temperature_bounds() {
        assert_eq!(clamp_temperature(45.0), 32.0);
        assert_eq!(clamp_temperature(-10.0), 8.0);
        assert_eq!(clamp_temperature(19.25), 19.25);
        assert_eq!(clamp_temperature(f64::NAN), 8.0);
        assert_eq!(clamp_temperature(f64::INFINITY), 32.0);
    }

    #[test]
    fn test_clamp_humidity_bounds() {
        assert_eq!(clamp_humidity(100.0), 85);
        assert_eq!(clamp_humidity(3.0), 30);
        assert_eq!(clamp_humidity(55.4), 55);
        assert_eq!(clamp_humidity(55.6), 56);
        assert_eq!(clamp_humidity(f64::NAN), 30);
    }

    #[test]
    fn test_snapshot_clamped() {
        let snapshot = WeatherSnapshot {
            temperature_c: 45.0,
            humidity: 99,
            ..sample_snapshot()
        }
        .clamped();

        assert_eq!(snapshot.temperature_c, 32.0);
        assert_eq!(snapshot.humidity, 85);

        let snapshot = WeatherSnapshot {
            temperature_c: 2.0,
            humidity: 5,
            ..sample_snapshot()
        }
        .clamped();

        assert_eq!(snapshot.temperature_c, 8.0);
        assert_eq!(snapshot.humidity, 30);
    }
}
