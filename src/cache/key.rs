//! Cache key construction
//!
//! Keys look like `weather:<schema-version>:<provider>:<normalized-city>:<bucket>`.
//! Bumping [`CACHE_SCHEMA_VERSION`] orphans every previously stored key.

use chrono::{DateTime, Utc};

use crate::config::ProviderSetting;

/// Version tag for the stored snapshot format
pub const CACHE_SCHEMA_VERSION: &str = "v1";

const KEY_PREFIX: &str = "weather";
const KEY_DELIMITER: &str = ":";

/// Index of the wall-clock aligned TTL window containing `now`
///
/// `floor(now_ms / (ttl_seconds * 1000))`. Requests a millisecond either side
/// of a window boundary land in different buckets. A zero TTL counts as one
/// second.
pub fn cache_bucket(now: DateTime<Utc>, ttl_seconds: u64) -> i64 {
    let window_ms = i64::try_from(ttl_seconds.max(1).saturating_mul(1000)).unwrap_or(i64::MAX);
    now.timestamp_millis().div_euclid(window_ms)
}

/// Build the cache key for one provider, city and bucket
pub fn build_cache_key(provider: ProviderSetting, normalized_city: &str, bucket: i64) -> String {
    [
        KEY_PREFIX,
        CACHE_SCHEMA_VERSION,
        provider.as_str(),
        normalized_city,
        &bucket.to_string(),
    ]
    .join(KEY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_key_format() {
        let key = build_cache_key(ProviderSetting::Auto, "shanghai", 2_845_123);
        assert_eq!(key, "weather:v1:auto:shanghai:2845123");

        let key = build_cache_key(ProviderSetting::OpenMeteo, "new york", 7);
        assert_eq!(key, "weather:v1:open-meteo:new york:7");
    }

    #[test]
    fn test_key_is_deterministic() {
        let samples = [
            (ProviderSetting::Auto, "beijing", 1),
            (ProviderSetting::Mock, "shanghai", 2_845_123),
            (ProviderSetting::OpenMeteo, "苏州，安徽", 0),
        ];
        for (provider, city, bucket) in samples {
            assert_eq!(
                build_cache_key(provider, city, bucket),
                build_cache_key(provider, city, bucket)
            );
        }
    }

    #[test]
    fn test_key_changes_with_each_field() {
        let base = build_cache_key(ProviderSetting::Auto, "beijing", 100);

        assert_ne!(base, build_cache_key(ProviderSetting::Mock, "beijing", 100));
        assert_ne!(base, build_cache_key(ProviderSetting::OpenMeteo, "beijing", 100));
        assert_ne!(base, build_cache_key(ProviderSetting::Auto, "shanghai", 100));
        assert_ne!(base, build_cache_key(ProviderSetting::Auto, "beijing", 101));
    }

    #[test]
    fn test_bucket_is_floor_of_ttl_window() {
        let now = Utc.timestamp_millis_opt(1_200_000).unwrap();
        assert_eq!(cache_bucket(now, 600), 2);

        let now = Utc.timestamp_millis_opt(1_199_999).unwrap();
        assert_eq!(cache_bucket(now, 600), 1);

        let now = Utc.timestamp_millis_opt(0).unwrap();
        assert_eq!(cache_bucket(now, 600), 0);
    }

    #[test]
    fn test_requests_straddling_a_boundary_get_different_buckets() {
        let before = Utc.timestamp_millis_opt(600_000 * 5 - 1).unwrap();
        let after = Utc.timestamp_millis_opt(600_000 * 5 + 1).unwrap();

        assert_ne!(cache_bucket(before, 600), cache_bucket(after, 600));
    }

    #[test]
    fn test_requests_within_a_window_share_a_bucket() {
        let start = Utc.timestamp_millis_opt(600_000 * 5).unwrap();
        let end = Utc.timestamp_millis_opt(600_000 * 6 - 1).unwrap();

        assert_eq!(cache_bucket(start, 600), cache_bucket(end, 600));
    }

    #[test]
    fn test_zero_ttl_uses_one_second_windows() {
        let now = Utc.timestamp_millis_opt(5_500).unwrap();
        assert_eq!(cache_bucket(now, 0), 5);
    }
}
