//! Response caching
//!
//! The engine only consumes a `get`/`set` capability; storage and eviction
//! semantics belong to the implementation behind the [`CacheClient`] trait.
//! An absent cache and a no-op cache are indistinguishable to the core, and
//! a failing cache degrades to a miss instead of aborting the pipeline.
//!
//! Keys are md5 content hashes of the page request identity, so two cursors
//! racing on the same page land on the same entry (last writer wins, both
//! read back a valid payload).

mod memory;

pub use memory::MemoryCache;

use crate::error::Result;
use crate::types::SearchRequest;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key/value capability consumed by the engine
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch a cached value, `None` on miss
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under a key
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Shared handle to an optional cache backend
pub type SharedCache = Option<Arc<dyn CacheClient>>;

// ============================================================================
// Keys
// ============================================================================

/// Cache key for a single page request
pub fn page_cache_key(page_url: &str) -> String {
    content_hash(page_url)
}

/// Cache key for the total-count lookup of a search request
pub fn count_cache_key(request: &SearchRequest) -> String {
    // Query params are a BTreeMap, so serialization order is stable
    let identity = serde_json::to_string(request).unwrap_or_else(|_| {
        format!(
            "{}/{}",
            request.base_url(),
            request.collection_key()
        )
    });
    content_hash(&identity)
}

fn content_hash(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

// ============================================================================
// Degrading accessors
// ============================================================================

/// Read through an optional cache. Backend errors degrade to a miss.
pub async fn lookup(cache: &SharedCache, key: &str) -> Option<String> {
    let client = cache.as_ref()?;
    match client.get(key).await {
        Ok(Some(value)) => {
            debug!("cache hit for {key}");
            Some(value)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("cache get failed for {key}, treating as miss: {e}");
            None
        }
    }
}

/// Write through an optional cache. Backend errors are logged and dropped.
pub async fn store(cache: &SharedCache, key: &str, value: &str) {
    let Some(client) = cache.as_ref() else {
        return;
    };
    if let Err(e) = client.set(key, value).await {
        warn!("cache set failed for {key}: {e}");
    }
}

// ============================================================================
// No-op cache
// ============================================================================

/// Cache that stores nothing. Behaviorally identical to no cache at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheClient for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}
