//! Record extraction from page payloads
//!
//! Pulls the record array out of a JSON page payload by path. Simple dot
//! paths (with array indexing) are resolved directly; wildcard patterns go
//! through jsonpath-rust.

use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};

/// Path-based record extractor
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    records_path: String,
}

impl RecordExtractor {
    /// Create an extractor for the given path (e.g. `features`)
    pub fn new(records_path: impl Into<String>) -> Self {
        Self {
            records_path: records_path.into(),
        }
    }

    /// The configured path
    pub fn path(&self) -> &str {
        &self.records_path
    }

    /// Extract the records under the configured path.
    ///
    /// A missing path yields an empty page, not an error; a page with no
    /// records and no next link simply ends its batch.
    pub fn extract(&self, payload: &JsonValue) -> Result<Vec<Record>> {
        let path = &self.records_path;
        if path.contains('*') {
            return extract_with_jsonpath(payload, path);
        }

        match extract_simple_path(payload, path) {
            Some(JsonValue::Array(arr)) => Ok(arr),
            Some(v) => Ok(vec![v]),
            None => Ok(vec![]),
        }
    }

    /// Replace the records under the configured path, keeping the rest of
    /// the payload (links, counts) intact.
    ///
    /// Only plain dot paths can be written back to; wildcard extractors
    /// cannot round-trip a payload.
    pub fn embed(&self, mut payload: JsonValue, records: Vec<Record>) -> Result<JsonValue> {
        let path = self
            .records_path
            .strip_prefix("$.")
            .unwrap_or(&self.records_path);
        if path.contains('*') || path.contains('[') {
            return Err(Error::extraction(
                path,
                "cannot embed records into a wildcard or indexed path",
            ));
        }

        set_simple_path(&mut payload, path, JsonValue::Array(records))?;
        Ok(payload)
    }
}

/// Set a value at a dot-notation path, creating intermediate objects
fn set_simple_path(root: &mut JsonValue, path: &str, value: JsonValue) -> Result<()> {
    let mut current = root;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let JsonValue::Object(map) = current else {
            return Err(Error::extraction(path, "payload is not an object"));
        };
        let slot = map
            .entry(part.to_string())
            .or_insert_with(|| JsonValue::Object(Default::default()));
        if parts.peek().is_none() {
            *slot = value;
            return Ok(());
        }
        current = slot;
    }

    Err(Error::extraction(path, "empty records path"))
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new("features")
    }
}

/// Extract a value using simple dot-notation path
fn extract_simple_path(value: &JsonValue, path: &str) -> Option<JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let parts: Vec<&str> = path.split('.').collect();

    let mut current = value;
    for part in parts {
        // Handle array indexing like "data[0]"
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = &part[bracket_pos + 1..part.len() - 1];

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index = index_str.parse::<i64>().ok()?;
            if let JsonValue::Array(arr) = current {
                let idx = if index < 0 {
                    (arr.len() as i64 + index) as usize
                } else {
                    index as usize
                };
                current = arr.get(idx)?;
            } else {
                return None;
            }
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &JsonValue, path: &str) -> Result<Vec<JsonValue>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::extraction(path, format!("invalid JSONPath: {e}")))?;

    match jp.find(value) {
        JsonValue::Array(arr) => Ok(arr),
        JsonValue::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
