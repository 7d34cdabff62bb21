//! File-backed snapshot store
//!
//! Provides a `FileSnapshotStore` that keeps each serialized snapshot in its own
//! JSON file together with a small TTL header.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{cache_control_header, CacheError, SnapshotCache};

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// Serialized snapshot
    payload: String,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
    /// TTL hint as a cache-control directive
    cache_control: String,
}

/// Stores snapshots as JSON files on disk
///
/// Files live in an XDG-compliant cache directory (`~/.cache/cityweather/` on
/// Linux). Entries past their `expires_at` read as absent.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a new store in the XDG cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "cityweather")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new store with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Returns the path to a cache file for the given key
    ///
    /// `:` becomes `_`. Everything else outside letters, digits, `-` and `.`
    /// (including `_` and `%` themselves) is percent-escaped byte by byte, so
    /// distinct keys never share a file.
    fn cache_path(&self, key: &str) -> PathBuf {
        let mut file_stem = String::with_capacity(key.len());
        for c in key.chars() {
            match c {
                ':' => file_stem.push('_'),
                c if c.is_alphanumeric() || c == '-' || c == '.' => file_stem.push(c),
                c => {
                    let mut buf = [0u8; 4];
                    for byte in c.encode_utf8(&mut buf).bytes() {
                        file_stem.push_str(&format!("%{:02X}", byte));
                    }
                }
            }
        }
        self.cache_dir.join(format!("{}.json", file_stem))
    }

    async fn read_entry(&self, key: &str) -> Result<Option<String>, CacheError> {
        let content = match tokio::fs::read_to_string(self.cache_path(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(key, "ignoring unreadable cache file: {}", e);
                return Ok(None);
            }
        };

        if Utc::now() > entry.expires_at {
            return Ok(None);
        }
        Ok(Some(entry.payload))
    }

    async fn write_entry(
        &self,
        key: &str,
        payload: String,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let now = Utc::now();
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let expires_at = Duration::try_seconds(ttl)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheEntry {
            payload,
            cached_at: now,
            expires_at,
            cache_control: cache_control_header(ttl_seconds),
        };

        let json = serde_json::to_string_pretty(&entry)?;
        tokio::fs::write(self.cache_path(key), json).await?;
        Ok(())
    }
}

impl SnapshotCache for FileSnapshotStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>> {
        Box::pin(self.read_entry(key))
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        payload: String,
        ttl_seconds: u64,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(self.write_entry(key, payload, ttl_seconds))
    }
}
