//! Search requests as sent to the backend.

use serde_json::{json, Map, Value};

use super::dsl::QueryDsl;
use crate::error::Result;
use crate::sql::{OrderBy, SortOrder};

/// One `_search` request against one index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target index; part of the URL, not of the body.
    pub index: String,
    /// Compiled query.
    pub query: QueryDsl,
    /// Hits to skip.
    pub from: Option<usize>,
    /// Max hits.
    pub size: Option<usize>,
    /// `_source` includes; empty means the whole document.
    pub source: Vec<String>,
    /// Sort clauses.
    pub sort: Vec<OrderBy>,
}

impl SearchRequest {
    /// Creates a request with no paging, projection or sort.
    #[must_use]
    pub fn new(index: impl Into<String>, query: impl Into<QueryDsl>) -> Self {
        Self {
            index: index.into(),
            query: query.into(),
            from: None,
            size: None,
            source: Vec::new(),
            sort: Vec::new(),
        }
    }

    /// Sets the max hit count.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub fn with_from(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }

    /// Restricts `_source` to `fields`. Duplicates are dropped.
    #[must_use]
    pub fn with_source<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.source.contains(&field) {
                self.source.push(field);
            }
        }
        self
    }

    /// Sets the sort clauses.
    #[must_use]
    pub fn with_sort(mut self, sort: Vec<OrderBy>) -> Self {
        self.sort = sort;
        self
    }

    /// Request body as JSON.
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.to_json());
        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if !self.source.is_empty() {
            body.insert("_source".to_string(), json!({ "includes": self.source }));
        }
        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|o| {
                    let order = match o.order {
                        SortOrder::Asc => "asc",
                        SortOrder::Desc => "desc",
                    };
                    json!({ o.field.as_str(): { "order": order } })
                })
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }
        Value::Object(body)
    }

    /// Pretty-printed body.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if rendering fails.
    pub fn explain(&self) -> Result<String> {
        to_pretty_json(&self.body())
    }
}

/// Pretty-prints `value` with object keys in sorted order at every level.
///
/// # Errors
///
/// Returns `Error::Serialization` if rendering fails.
pub fn to_pretty_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(&sorted(value))?)
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
