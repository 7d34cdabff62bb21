//! City weather resolution
//!
//! `WeatherService` ties the pieces together: normalize the city, build a
//! time-bucketed cache key, serve from cache when possible, otherwise try the
//! live provider and fall back to mock data, clamp, store, and return.
//!
//! Resolution never fails. The worst case is deterministic mock data.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::{build_cache_key, cache_bucket, SnapshotCache};
use crate::config::WeatherConfig;
use crate::data::{
    generate_mock, normalize_city, CacheStatus, LiveLookup, OpenMeteoLookup, WeatherSnapshot,
};

/// Resolves cities to weather snapshots through a cache and a live provider
#[derive(Clone)]
pub struct WeatherService {
    cache: Arc<dyn SnapshotCache>,
    live: Arc<dyn LiveLookup>,
    config: WeatherConfig,
}

impl WeatherService {
    /// Create a service from explicit collaborators
    ///
    /// `config` is the default for every call. Callers that re-read settings
    /// per request pass them to [`Self::get_weather_with_config_at`]; the live
    /// lookup keeps the hosts it was built with either way.
    pub fn new(
        cache: Arc<dyn SnapshotCache>,
        live: Arc<dyn LiveLookup>,
        config: WeatherConfig,
    ) -> Self {
        Self {
            cache,
            live,
            config,
        }
    }

    /// Create a service that uses Open-Meteo for live lookups
    pub fn with_open_meteo(cache: Arc<dyn SnapshotCache>, config: WeatherConfig) -> Self {
        let live = Arc::new(OpenMeteoLookup::from_config(&config));
        Self::new(cache, live, config)
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    /// Resolve weather for a raw, user-supplied city name
    pub async fn get_weather_by_city(&self, raw_city: Option<&str>) -> WeatherSnapshot {
        self.get_weather_by_city_at(raw_city, Utc::now()).await
    }

    /// Resolve weather as of `now`, which selects the cache bucket
    pub async fn get_weather_by_city_at(
        &self,
        raw_city: Option<&str>,
        now: DateTime<Utc>,
    ) -> WeatherSnapshot {
        self.get_weather_with_config_at(raw_city, &self.config, now)
            .await
    }

    /// Resolve weather with settings read for this call only
    ///
    /// Provider, TTL, timeout and the cache-disable flag all come from
    /// `config`. The hosts and raw-logging flag stay those of the live lookup.
    pub async fn get_weather_with_config_at(
        &self,
        raw_city: Option<&str>,
        config: &WeatherConfig,
        now: DateTime<Utc>,
    ) -> WeatherSnapshot {
        let normalized_city = normalize_city(raw_city);
        let bucket = cache_bucket(now, config.cache_ttl_seconds);
        let cache_key = build_cache_key(config.provider, &normalized_city, bucket);

        if config.cache_disabled {
            let snapshot = self.fetch_or_mock(&normalized_city, config).await.clamped();
            tracing::debug!(key = %cache_key, source = ?snapshot.source, "cache bypassed");
            return annotate(snapshot, cache_key, normalized_city, CacheStatus::Bypass);
        }

        if let Some(cached) = self.read_cached(&cache_key).await {
            tracing::debug!(key = %cache_key, "cache hit");
            return annotate(cached.clamped(), cache_key, normalized_city, CacheStatus::Hit);
        }

        let snapshot = self.fetch_or_mock(&normalized_city, config).await.clamped();
        let snapshot = annotate(snapshot, cache_key, normalized_city, CacheStatus::Miss);
        self.store(&snapshot, config.cache_ttl_seconds).await;
        tracing::debug!(key = %snapshot.cache_key, source = ?snapshot.source, "cache miss");
        snapshot
    }

    /// Live lookup when the provider setting allows it, mock otherwise
    async fn fetch_or_mock(&self, normalized_city: &str, config: &WeatherConfig) -> WeatherSnapshot {
        if config.provider.allows_live() {
            match self.live.lookup(normalized_city, config.timeout()).await {
                Ok(observation) => return observation.into_snapshot(normalized_city),
                Err(e) => {
                    tracing::warn!(city = normalized_city, "live lookup failed, using mock data: {}", e);
                }
            }
        }
        generate_mock(normalized_city)
    }

    /// Read and decode a cached snapshot; any failure counts as a miss
    async fn read_cached(&self, cache_key: &str) -> Option<WeatherSnapshot> {
        let payload = match self.cache.get(cache_key).await {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::warn!(key = cache_key, "cache read failed: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key = cache_key, "discarding undecodable cache entry: {}", e);
                None
            }
        }
    }

    /// Persist a snapshot; failures are logged and otherwise ignored
    async fn store(&self, snapshot: &WeatherSnapshot, ttl_seconds: u64) {
        let payload = match serde_json::to_string(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %snapshot.cache_key, "failed to encode snapshot: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .cache
            .put(&snapshot.cache_key, payload, ttl_seconds)
            .await
        {
            tracing::warn!(key = %snapshot.cache_key, "cache write failed: {}", e);
        }
    }
}

/// Overlay the call-scoped fields; whatever the payload carried is discarded
fn annotate(
    mut snapshot: WeatherSnapshot,
    cache_key: String,
    normalized_city: String,
    cache_status: CacheStatus,
) -> WeatherSnapshot {
    snapshot.cache_key = cache_key;
    snapshot.normalized_city = normalized_city;
    snapshot.cache_status = cache_status;
    snapshot
}
