//! In-process snapshot store

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use super::{cache_control_header, CacheError, SnapshotCache};

#[derive(Debug)]
struct MemoryEntry {
    payload: String,
    expires_at: DateTime<Utc>,
    cache_control: String,
}

/// Keeps snapshots in a map for the lifetime of the process
///
/// Expired entries read as absent and are dropped on the next write.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// The cache-control directive recorded with a live entry
    pub async fn cache_control(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        let now = Utc::now();
        entries
            .get(key)
            .filter(|entry| now <= entry.expires_at)
            .map(|entry| entry.cache_control.clone())
    }
}

impl SnapshotCache for MemorySnapshotStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            let now = Utc::now();
            Ok(entries
                .get(key)
                .filter(|entry| now <= entry.expires_at)
                .map(|entry| entry.payload.clone()))
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        payload: String,
        ttl_seconds: u64,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let now = Utc::now();
            let expires_at = i64::try_from(ttl_seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);

            let mut entries = self.entries.lock().await;
            entries.retain(|_, entry| now <= entry.expires_at);
            entries.insert(
                key.to_string(),
                MemoryEntry {
                    payload,
                    expires_at,
                    cache_control: cache_control_header(ttl_seconds),
                },
            );
            Ok(())
        })
    }
}
