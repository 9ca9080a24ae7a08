//! In-memory transport for executor tests.
//!
//! Evaluates the compiled query DSL against stored documents and records
//! every call.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::query::{QueryDsl, SearchRequest};
use crate::transport::{Document, MultiSearchItem, SearchHits, SearchTransport};

/// Call-recording [`SearchTransport`] over in-memory indexes.
#[derive(Default)]
pub(crate) struct StubTransport {
    indexes: HashMap<String, Vec<Document>>,
    failing_index: Option<String>,
    failing_marker: Option<String>,
    panicking_marker: Option<String>,
    /// Every single search, in call order.
    pub searches: Mutex<Vec<SearchRequest>>,
    /// Request count of every multi-search call, in completion order.
    pub multi_searches: Mutex<Vec<usize>>,
}

impl StubTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds documents to `index`; each body gets a sequential ID.
    pub(crate) fn with_index(mut self, index: &str, docs: Vec<Value>) -> Self {
        let entry = self.indexes.entry(index.to_string()).or_default();
        for body in docs {
            let mut doc = Document::new(entry.len().to_string(), body);
            doc.index = index.to_string();
            entry.push(doc);
        }
        self
    }

    /// Makes every search against `index` fail.
    pub(crate) fn failing_search(mut self, index: &str) -> Self {
        self.failing_index = Some(index.to_string());
        self
    }

    /// Makes a multi-search call fail when one of its request bodies
    /// contains `marker`.
    pub(crate) fn failing_multi_search(mut self, marker: &str) -> Self {
        self.failing_marker = Some(marker.to_string());
        self
    }

    /// Makes a multi-search call panic when one of its request bodies
    /// contains `marker`.
    pub(crate) fn panicking_multi_search(mut self, marker: &str) -> Self {
        self.panicking_marker = Some(marker.to_string());
        self
    }

    pub(crate) fn search_count(&self) -> usize {
        self.searches.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub(crate) fn multi_search_sizes(&self) -> Vec<usize> {
        self.multi_searches
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn run(&self, request: &SearchRequest) -> SearchHits {
        let docs = self
            .indexes
            .get(&request.index)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut hits: Vec<Document> = docs
            .iter()
            .filter(|d| matches(&request.query, d))
            .cloned()
            .collect();
        let total = hits.len() as u64;
        if let Some(size) = request.size {
            hits.truncate(size);
        }
        SearchHits { total, hits }
    }
}

#[async_trait]
impl SearchTransport for StubTransport {
    async fn search(&self, request: &SearchRequest) -> Result<SearchHits> {
        if let Ok(mut searches) = self.searches.lock() {
            searches.push(request.clone());
        }
        if self.failing_index.as_deref() == Some(request.index.as_str()) {
            return Err(Error::Transport(format!("index '{}' unavailable", request.index)));
        }
        Ok(self.run(request))
    }

    async fn multi_search(&self, requests: &[SearchRequest]) -> Result<Vec<MultiSearchItem>> {
        tokio::task::yield_now().await;
        if let Ok(mut calls) = self.multi_searches.lock() {
            calls.push(requests.len());
        }
        let hit = |marker: &Option<String>| {
            marker.as_ref().is_some_and(|m| {
                requests.iter().any(|r| r.body().to_string().contains(m.as_str()))
            })
        };
        assert!(!hit(&self.panicking_marker), "multi search crashed");
        if let Some(marker) = &self.failing_marker {
            if requests.iter().any(|r| r.body().to_string().contains(marker)) {
                return Err(Error::Transport("multi search rejected".to_string()));
            }
        }
        Ok(requests
            .iter()
            .map(|r| MultiSearchItem::Hits(self.run(r)))
            .collect())
    }
}

fn matches(query: &QueryDsl, doc: &Document) -> bool {
    match query {
        QueryDsl::Bool(b) => {
            b.must.iter().all(|q| matches(q, doc))
                && b.filter.iter().all(|q| matches(q, doc))
                && !b.must_not.iter().any(|q| matches(q, doc))
                && (b.should.is_empty()
                    || !b.must.is_empty()
                    || !b.filter.is_empty()
                    || b.should.iter().any(|q| matches(q, doc)))
        }
        QueryDsl::Term { field, value } => doc.get(field).is_some_and(|v| equal(v, value)),
        QueryDsl::Terms { field, values } => doc
            .get(field)
            .is_some_and(|v| values.iter().any(|x| equal(v, x))),
        QueryDsl::Range { field, bounds } => doc.get(field).is_some_and(|v| {
            let check = |bound: &Option<Value>, ok: fn(Ordering) -> bool| {
                bound
                    .as_ref()
                    .map_or(true, |b| compare(v, b).is_some_and(ok))
            };
            check(&bounds.gt, Ordering::is_gt)
                && check(&bounds.gte, Ordering::is_ge)
                && check(&bounds.lt, Ordering::is_lt)
                && check(&bounds.lte, Ordering::is_le)
        }),
        QueryDsl::Exists { field } => doc.get(field).is_some_and(|v| !v.is_null()),
        QueryDsl::MatchAll => true,
        _ => false,
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
