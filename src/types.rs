//! Common types used throughout pagefan
//!
//! This module contains the data model shared across modules: the search
//! request, derived page keys and batch plans, and type aliases.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// A record carried through the pipeline. Records cross the core untouched;
/// the only place the engine looks inside one is the enrichment hook.
pub type Record = serde_json::Value;

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Search Request
// ============================================================================

/// An inbound search request.
///
/// Immutable once constructed: a fetch plan is derived from it, and the
/// planner, factory, and cursors all read the same snapshot. Query
/// parameters pass through to the remote endpoint untouched except for the
/// computed `limit`/`startindex` overrides applied per page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    base_url: String,
    collection_key: String,
    // BTreeMap keeps serialization stable so request hashes are stable too
    query: BTreeMap<String, String>,
    sort_requested: bool,
    hub_api_url: Option<String>,
}

impl SearchRequest {
    /// Create a request for a collection with no extra query parameters
    pub fn new(base_url: impl Into<String>, collection_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection_key: collection_key.into(),
            query: BTreeMap::new(),
            sort_requested: false,
            hub_api_url: None,
        }
    }

    /// Create a request carrying the caller's query parameters.
    ///
    /// A `sortby` parameter marks the request as ordered, which switches the
    /// merge engine into strict batch-order draining.
    pub fn with_query<I, K, V>(
        base_url: impl Into<String>,
        collection_key: impl Into<String>,
        query: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let query: BTreeMap<String, String> = query
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let sort_requested = query.contains_key("sortby");
        Self {
            base_url: base_url.into(),
            collection_key: collection_key.into(),
            query,
            sort_requested,
            hub_api_url: None,
        }
    }

    /// Probe the total count against a dedicated hub API endpoint instead
    /// of the site itself
    #[must_use]
    pub fn with_hub_api_url(mut self, hub_api_url: impl Into<String>) -> Self {
        self.hub_api_url = Some(hub_api_url.into());
        self
    }

    /// Base URL of the remote site
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Collection identifier within the search API
    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    /// The caller's query parameters
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Caller-supplied result limit, if any
    pub fn limit(&self) -> Option<u64> {
        self.query.get("limit").and_then(|v| v.parse().ok())
    }

    /// Caller-supplied start index, if any
    pub fn start_index(&self) -> Option<u64> {
        self.query.get("startindex").and_then(|v| v.parse().ok())
    }

    /// Whether the caller asked for a total ordering
    pub fn sort_requested(&self) -> bool {
        self.sort_requested
    }

    /// Alternate base URL for the total-count probe, if any
    pub fn hub_api_url(&self) -> Option<&str> {
        self.hub_api_url.as_deref()
    }
}

// ============================================================================
// Page Key
// ============================================================================

/// The (start index, page size) pair identifying one page request.
///
/// Derived by the batch planner, never mutated after creation. Start
/// indices are 1-based, matching the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageKey {
    /// 1-based index of the first record on the page
    pub start_index: u64,
    /// Number of records requested for the page
    pub limit: u64,
}

impl PageKey {
    /// Create a new page key
    pub fn new(start_index: u64, limit: u64) -> Self {
        Self { start_index, limit }
    }
}

// ============================================================================
// Batch Plan
// ============================================================================

/// How an unknown-until-queried total is partitioned into parallel batches.
///
/// Invariant: `num_batches <= MAX_NUM_BATCHES`, and `num_batches == 0`
/// exactly when the total is zero or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchPlan {
    /// Number of parallel batches to run
    pub num_batches: u32,
    /// Pages each batch covers
    pub pages_per_batch: u32,
    /// Records per page
    pub page_size: u32,
}

impl BatchPlan {
    /// The empty plan: no batches, no pages, no records
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this plan produces no batches at all
    pub fn is_empty(&self) -> bool {
        self.num_batches == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_accessors() {
        let request = SearchRequest::with_query(
            "https://data.example.com",
            "datasets",
            [("q", "water"), ("limit", "250"), ("startindex", "11")],
        );

        assert_eq!(request.base_url(), "https://data.example.com");
        assert_eq!(request.collection_key(), "datasets");
        assert_eq!(request.limit(), Some(250));
        assert_eq!(request.start_index(), Some(11));
        assert!(!request.sort_requested());
    }

    #[test]
    fn test_search_request_sort_detection() {
        let request = SearchRequest::with_query(
            "https://data.example.com",
            "datasets",
            [("sortby", "title")],
        );
        assert!(request.sort_requested());

        let request = SearchRequest::new("https://data.example.com", "datasets");
        assert!(!request.sort_requested());
    }

    #[test]
    fn test_search_request_non_numeric_limit_ignored() {
        let request = SearchRequest::with_query(
            "https://data.example.com",
            "datasets",
            [("limit", "all")],
        );
        assert_eq!(request.limit(), None);
    }

    #[test]
    fn test_batch_plan_empty() {
        let plan = BatchPlan::empty();
        assert!(plan.is_empty());
        assert_eq!(plan.num_batches, 0);
        assert_eq!(plan.pages_per_batch, 0);
        assert_eq!(plan.page_size, 0);
    }
}
