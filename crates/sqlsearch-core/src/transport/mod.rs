//! Search backend abstraction.
//!
//! The join engine only talks to a [`SearchTransport`]. [`HttpTransport`]
//! speaks the Elasticsearch REST API; tests plug in in-memory stubs.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::query::SearchRequest;

/// A search hit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document ID (`_id`).
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Index the hit came from (`_index`).
    #[serde(rename = "_index", default)]
    pub index: String,
    /// Document body (`_source`).
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
}

impl Document {
    /// Creates a document from an ID and a JSON object body.
    ///
    /// Non-object bodies yield an empty source.
    #[must_use]
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            index: String::new(),
            source: match source {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    /// Looks up a field by dot path (`address.city`).
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.source.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

/// Hits of one search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchHits {
    /// Total matching documents reported by the backend.
    pub total: u64,
    /// Returned hits, in backend order.
    pub hits: Vec<Document>,
}

impl SearchHits {
    /// Wraps hits, using their count as the total.
    #[must_use]
    pub fn from_hits(hits: Vec<Document>) -> Self {
        Self {
            total: hits.len() as u64,
            hits,
        }
    }
}

/// Outcome of one request inside a multi-search call.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiSearchItem {
    /// The request succeeded.
    Hits(SearchHits),
    /// The request failed; the others may still have succeeded.
    Failed(String),
}

/// Search backend.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Runs one search.
    async fn search(&self, request: &SearchRequest) -> Result<SearchHits>;

    /// Runs several independent searches in one call.
    ///
    /// Returns one item per request, in submission order.
    async fn multi_search(&self, requests: &[SearchRequest]) -> Result<Vec<MultiSearchItem>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_get_dot_path() {
        let doc = Document::new("1", json!({ "a": { "b": { "c": 3 } }, "x": 1 }));
        assert_eq!(doc.get("a.b.c"), Some(&json!(3)));
        assert_eq!(doc.get("x"), Some(&json!(1)));
        assert_eq!(doc.get("x.y"), None);
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn test_document_deserializes_hit() {
        let doc: Document = serde_json::from_value(json!({
            "_id": "7",
            "_index": "users",
            "_score": 1.0,
            "_source": { "name": "ann" }
        }))
        .unwrap();
        assert_eq!(doc.id, "7");
        assert_eq!(doc.index, "users");
        assert_eq!(doc.get("name"), Some(&json!("ann")));
    }
}
