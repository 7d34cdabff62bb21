//! Snapshot cache for resolved weather
//!
//! The resolver talks to its backing store only through [`SnapshotCache`], so
//! the store can be a directory of JSON files, an in-process map, or a test
//! double. Keys carry a schema version and a time bucket (see [`key`]); an
//! entry stops being read once the bucket advances, without explicit deletion.

pub mod key;
mod manager;
mod memory;

pub use key::{build_cache_key, cache_bucket, CACHE_SCHEMA_VERSION};
pub use manager::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use futures::future::BoxFuture;
use thiserror::Error;

/// Errors reported by a snapshot store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing storage failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The cache entry could not be encoded
    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    /// Failure reported by a store that is neither file nor memory backed
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// A key/value store for serialized snapshots
///
/// `ttl_seconds` is a hint; honoring it (and evicting) is up to the store.
pub trait SnapshotCache: Send + Sync {
    /// Fetch the serialized snapshot stored under `key`, if any
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>>;

    /// Store a serialized snapshot under `key`
    fn put<'a>(
        &'a self,
        key: &'a str,
        payload: String,
        ttl_seconds: u64,
    ) -> BoxFuture<'a, Result<(), CacheError>>;
}

/// `Cache-Control` value recorded alongside each stored entry
pub(crate) fn cache_control_header(ttl_seconds: u64) -> String {
    format!("public, max-age={}", ttl_seconds)
}
