//! OGC Records search source
//!
//! Implements [`PageSource`] for OGC API search endpoints of the shape
//! `{base}/api/search/v1/collections/{collection}/items`. Records live in
//! the payload's `features` array; pagination follows the `links[]` entry
//! with `rel == "next"`; a `limit=0` request returns `numberMatched`
//! without returning records.

use super::extract::RecordExtractor;
use super::PageSource;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::types::{JsonValue, PageKey, Record, SearchRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Relative path of the items endpoint under a collection
const ITEMS_PATH: &str = "api/search/v1/collections";

/// `rel` value of the pagination link
const NEXT_REL: &str = "next";

/// Field carrying the total match count in a probe response
const NUMBER_MATCHED: &str = "numberMatched";

/// [`PageSource`] implementation for OGC Records search APIs
#[derive(Debug, Clone)]
pub struct OgcSearchSource {
    http: Arc<HttpClient>,
    extractor: RecordExtractor,
}

impl OgcSearchSource {
    /// Create a source over the given transport
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            extractor: RecordExtractor::default(),
        }
    }

    /// Create a source with a non-default records path
    pub fn with_extractor(http: Arc<HttpClient>, extractor: RecordExtractor) -> Self {
        Self { http, extractor }
    }

    /// Build an items URL, passing the caller's query through untouched
    /// except for the computed `limit`/`startindex` overrides
    fn items_url(
        &self,
        base: &str,
        request: &SearchRequest,
        limit: u64,
        start_index: Option<u64>,
    ) -> Result<Url> {
        let base = base.trim_end_matches('/');
        let mut url = Url::parse(&format!(
            "{base}/{ITEMS_PATH}/{}/items",
            request.collection_key()
        ))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in request.query() {
                if key == "limit" || key == "startindex" {
                    continue;
                }
                pairs.append_pair(key, value);
            }
            pairs.append_pair("limit", &limit.to_string());
            if let Some(start_index) = start_index {
                pairs.append_pair("startindex", &start_index.to_string());
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl PageSource for OgcSearchSource {
    fn page_url(&self, request: &SearchRequest, key: &PageKey) -> Result<String> {
        let url = self.items_url(
            request.base_url(),
            request,
            key.limit,
            Some(key.start_index),
        )?;
        Ok(url.into())
    }

    async fn load_page(&self, page_url: &str) -> Result<JsonValue> {
        debug!("loading page {page_url}");
        self.http
            .get_json(page_url)
            .await
            .map_err(|e| Error::page_load(page_url, e.to_string()))
    }

    fn extract_records(&self, payload: &JsonValue) -> Result<Vec<Record>> {
        self.extractor.extract(payload)
    }

    fn embed_records(&self, payload: JsonValue, records: Vec<Record>) -> Result<JsonValue> {
        self.extractor.embed(payload, records)
    }

    fn next_page_url(&self, payload: &JsonValue) -> Result<Option<String>> {
        let Some(links) = payload.get("links").and_then(JsonValue::as_array) else {
            return Ok(None);
        };

        for link in links {
            if link.get("rel").and_then(JsonValue::as_str) != Some(NEXT_REL) {
                continue;
            }
            return match link.get("href") {
                Some(JsonValue::String(href)) => Ok(Some(href.clone())),
                _ => Err(Error::paging("next link carries no usable href")),
            };
        }

        Ok(None)
    }

    async fn total_count(&self, request: &SearchRequest) -> Result<u64> {
        // The probe goes to the dedicated hub API when the request names one
        let base = request.hub_api_url().unwrap_or_else(|| request.base_url());
        let url = self.items_url(base, request, 0, None)?;
        debug!("probing total count at {url}");

        let payload: JsonValue = self
            .http
            .get_json(url.as_str())
            .await
            .map_err(|e| Error::count_probe(e.to_string()))?;

        payload
            .get(NUMBER_MATCHED)
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| {
                Error::count_probe(format!("probe response carries no {NUMBER_MATCHED}"))
            })
    }
}
