//! Paginated page sources
//!
//! A [`PageSource`] is the seam between the paging core and a concrete
//! remote search API: it builds page URLs, fetches page payloads, pulls
//! records out of them, and follows next-page links. The core never looks
//! at the wire shape itself.
//!
//! [`OgcSearchSource`] is the built-in implementation for OGC Records
//! search endpoints.

mod extract;
mod ogc;

pub use extract::RecordExtractor;
pub use ogc::OgcSearchSource;

use crate::error::Result;
use crate::types::{JsonValue, PageKey, Record, SearchRequest};
use async_trait::async_trait;

/// One paginated remote endpoint
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Build the request URL for one page of a search request
    fn page_url(&self, request: &SearchRequest, key: &PageKey) -> Result<String>;

    /// Fetch one page payload
    async fn load_page(&self, page_url: &str) -> Result<JsonValue>;

    /// Pull the records out of a page payload, in page order
    fn extract_records(&self, payload: &JsonValue) -> Result<Vec<Record>>;

    /// Replace a payload's records with their enriched forms, keeping the
    /// rest of the payload intact, so the cached page replays directly
    fn embed_records(&self, payload: JsonValue, records: Vec<Record>) -> Result<JsonValue>;

    /// URL of the next page, `None` when the payload links no further page
    fn next_page_url(&self, payload: &JsonValue) -> Result<Option<String>>;

    /// Issue the zero-limit probe request and return the total match count
    async fn total_count(&self, request: &SearchRequest) -> Result<u64>;
}

#[cfg(test)]
mod tests;
