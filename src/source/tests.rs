//! Tests for page sources

use super::*;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_source() -> OgcSearchSource {
    let config = HttpClientConfig::builder().no_rate_limit().build();
    OgcSearchSource::new(Arc::new(HttpClient::with_config(config)))
}

// ============================================================================
// RecordExtractor
// ============================================================================

#[test]
fn test_extractor_simple_path() {
    let payload = json!({"features": [{"id": 1}, {"id": 2}]});
    let records = RecordExtractor::default().extract(&payload).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], 1);
}

#[test]
fn test_extractor_missing_path_yields_empty_page() {
    let payload = json!({"links": []});
    let records = RecordExtractor::default().extract(&payload).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_extractor_nested_path() {
    let payload = json!({"result": {"items": [{"id": "a"}]}});
    let records = RecordExtractor::new("result.items").extract(&payload).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "a");
}

#[test]
fn test_extractor_wildcard_path() {
    let payload = json!({"pages": [{"features": [{"id": 1}]}, {"features": [{"id": 2}]}]});
    let records = RecordExtractor::new("$.pages[*].features[*]")
        .extract(&payload)
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_extractor_scalar_becomes_single_record() {
    let payload = json!({"features": {"id": 1}});
    let records = RecordExtractor::default().extract(&payload).unwrap();
    assert_eq!(records.len(), 1);
}

// ============================================================================
// OgcSearchSource — URL building
// ============================================================================

#[test]
fn test_page_url_shape() {
    let source = test_source();
    let request = SearchRequest::with_query(
        "https://data.example.com/",
        "datasets",
        [("q", "water")],
    );
    let url = source
        .page_url(&request, &PageKey::new(101, 100))
        .unwrap();

    assert!(url.starts_with(
        "https://data.example.com/api/search/v1/collections/datasets/items?"
    ));
    assert!(url.contains("q=water"));
    assert!(url.contains("limit=100"));
    assert!(url.contains("startindex=101"));
}

#[test]
fn test_page_url_overrides_caller_paging_params() {
    let source = test_source();
    let request = SearchRequest::with_query(
        "https://data.example.com",
        "datasets",
        [("limit", "9999"), ("startindex", "7")],
    );
    let url = source.page_url(&request, &PageKey::new(1, 50)).unwrap();

    // The computed overrides win; the caller's values never reach the wire
    assert!(url.contains("limit=50"));
    assert!(url.contains("startindex=1"));
    assert!(!url.contains("9999"));
}

#[test]
fn test_page_url_rejects_invalid_base() {
    let source = test_source();
    let request = SearchRequest::new("not a url", "datasets");
    assert!(source.page_url(&request, &PageKey::new(1, 100)).is_err());
}

// ============================================================================
// OgcSearchSource — next links
// ============================================================================

#[test]
fn test_next_page_url_found() {
    let source = test_source();
    let payload = json!({
        "features": [],
        "links": [
            {"rel": "self", "href": "https://x/items?startindex=1"},
            {"rel": "next", "href": "https://x/items?startindex=101"}
        ]
    });
    assert_eq!(
        source.next_page_url(&payload).unwrap(),
        Some("https://x/items?startindex=101".to_string())
    );
}

#[test]
fn test_next_page_url_absent_ends_batch() {
    let source = test_source();
    let payload = json!({"features": [], "links": [{"rel": "self", "href": "https://x"}]});
    assert_eq!(source.next_page_url(&payload).unwrap(), None);

    let payload = json!({"features": []});
    assert_eq!(source.next_page_url(&payload).unwrap(), None);
}

#[test]
fn test_next_page_url_malformed_href_is_error() {
    let source = test_source();
    let payload = json!({"links": [{"rel": "next", "href": 42}]});
    let err = source.next_page_url(&payload).unwrap_err();
    assert!(matches!(err, Error::PagingComputation { .. }));
}

// ============================================================================
// OgcSearchSource — HTTP
// ============================================================================

#[tokio::test]
async fn test_load_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search/v1/collections/datasets/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [{"id": 1}],
            "links": []
        })))
        .mount(&mock_server)
        .await;

    let source = test_source();
    let request = SearchRequest::new(mock_server.uri(), "datasets");
    let url = source.page_url(&request, &PageKey::new(1, 100)).unwrap();
    let payload = source.load_page(&url).await.unwrap();

    assert_eq!(payload["features"][0]["id"], 1);
}

#[tokio::test]
async fn test_load_page_failure_is_page_load_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let source = test_source();
    let request = SearchRequest::new(mock_server.uri(), "datasets");
    let url = source.page_url(&request, &PageKey::new(1, 100)).unwrap();
    let err = source.load_page(&url).await.unwrap_err();

    assert!(matches!(err, Error::PageLoad { .. }));
}

#[tokio::test]
async fn test_total_count_probe() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search/v1/collections/datasets/items"))
        .and(query_param("limit", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numberMatched": 324,
            "features": []
        })))
        .mount(&mock_server)
        .await;

    let source = test_source();
    let request = SearchRequest::new(mock_server.uri(), "datasets");
    assert_eq!(source.total_count(&request).await.unwrap(), 324);
}

#[tokio::test]
async fn test_total_count_probes_hub_api_when_present() {
    let hub_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search/v1/collections/datasets/items"))
        .and(query_param("limit", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numberMatched": 12
        })))
        .mount(&hub_server)
        .await;

    let source = test_source();
    // The site itself is unreachable; only the hub API can answer
    let request = SearchRequest::new("https://site.invalid", "datasets")
        .with_hub_api_url(hub_server.uri());
    assert_eq!(source.total_count(&request).await.unwrap(), 12);
}

#[tokio::test]
async fn test_total_count_missing_field_is_probe_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
        .mount(&mock_server)
        .await;

    let source = test_source();
    let request = SearchRequest::new(mock_server.uri(), "datasets");
    let err = source.total_count(&request).await.unwrap_err();

    assert!(matches!(err, Error::CountProbe { .. }));
}
