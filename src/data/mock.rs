//! Deterministic fallback weather
//!
//! When no live data is available the resolver still has to answer. The values
//! here are derived only from the normalized city name, so the same city always
//! gets the same weather (apart from the observation timestamp).

use chrono::{SecondsFormat, Utc};

use super::{CacheStatus, Condition, SnapshotSource, WeatherSnapshot};

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Conditions the mock generator picks from
pub const MOCK_CONDITIONS: [Condition; 6] = [
    Condition::Clear,
    Condition::Cloudy,
    Condition::Overcast,
    Condition::LightRain,
    Condition::Showers,
    Condition::Fog,
];

/// 32-bit FNV-1a fold over the UTF-16 code units of `input`
pub fn fnv1a_32(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Build the mock snapshot for a normalized city name
///
/// The call-scoped fields (`cache_key`, `cache_status`) are left for the
/// service to fill in.
pub fn generate_mock(normalized_city: &str) -> WeatherSnapshot {
    let hash = fnv1a_32(normalized_city);

    let temperature_c = f64::from(8 + hash % 25);
    // Always < 86, fits in u8
    let humidity = (30 + (hash >> 8) % 56) as u8;
    let condition = MOCK_CONDITIONS[((hash >> 16) % 6) as usize];

    WeatherSnapshot {
        condition,
        temperature_c,
        humidity,
        source: SnapshotSource::Mock,
        observed_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        cache_key: String::new(),
        cache_status: CacheStatus::Miss,
        normalized_city: normalized_city.to_string(),
        geocode: None,
    }
}
