//! In-memory form of the search engine's query DSL.
//!
//! Values render to the engine's JSON through [`QueryDsl::to_json`]; the
//! `Serialize` impl delegates to it so requests embed queries directly.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Bounds of a `range` query. Unset bounds are omitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeBounds {
    /// Exclusive lower bound.
    pub gt: Option<Value>,
    /// Inclusive lower bound.
    pub gte: Option<Value>,
    /// Exclusive upper bound.
    pub lt: Option<Value>,
    /// Inclusive upper bound.
    pub lte: Option<Value>,
}

/// A compound `bool` query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    /// Clauses that must match and contribute to the score.
    pub must: Vec<QueryDsl>,
    /// Alternatives; at least one must match when there is no `must`/`filter`.
    pub should: Vec<QueryDsl>,
    /// Clauses that must not match.
    pub must_not: Vec<QueryDsl>,
    /// Clauses that must match without scoring.
    pub filter: Vec<QueryDsl>,
}

impl BoolQuery {
    /// Creates an empty bool query (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `must` clause.
    #[must_use]
    pub fn must(mut self, query: QueryDsl) -> Self {
        self.must.push(query);
        self
    }

    /// Adds a `should` clause.
    #[must_use]
    pub fn should(mut self, query: QueryDsl) -> Self {
        self.should.push(query);
        self
    }

    /// Adds a `must_not` clause.
    #[must_use]
    pub fn must_not(mut self, query: QueryDsl) -> Self {
        self.must_not.push(query);
        self
    }

    /// Adds a `filter` clause.
    #[must_use]
    pub fn filter(mut self, query: QueryDsl) -> Self {
        self.filter.push(query);
        self
    }

    /// True when no clause is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
    }

    /// Renders `{"bool": {...}}`, omitting empty clause lists.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(QueryDsl::to_json).collect()),
                );
            }
        }
        json!({ "bool": Value::Object(body) })
    }
}

/// A query node.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryDsl {
    /// Compound boolean query.
    Bool(BoolQuery),
    /// Exact value match.
    Term {
        /// Field name.
        field: String,
        /// Value.
        value: Value,
    },
    /// Match any of several exact values.
    Terms {
        /// Field name.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Range over a field.
    Range {
        /// Field name.
        field: String,
        /// Bounds.
        bounds: RangeBounds,
    },
    /// Wildcard pattern (`*` and `?`).
    Wildcard {
        /// Field name.
        field: String,
        /// Engine wildcard pattern.
        pattern: String,
    },
    /// Field has a non-null value.
    Exists {
        /// Field name.
        field: String,
    },
    /// Spatial relation against a WKT shape.
    GeoShape {
        /// Geo field.
        field: String,
        /// Shape in WKT.
        shape: String,
        /// Spatial relation, e.g. `intersects`.
        relation: String,
    },
    /// Query evaluated inside nested objects.
    Nested {
        /// Nested object path.
        path: String,
        /// Inner query.
        query: Box<QueryDsl>,
    },
    /// Query matched against child documents.
    HasChild {
        /// Child relation type.
        child_type: String,
        /// Inner query.
        query: Box<QueryDsl>,
    },
    /// Matches every document.
    MatchAll,
}

impl QueryDsl {
    /// Renders the engine JSON for this node.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => b.to_json(),
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Self::Range { field, bounds } => {
                let mut body = Map::new();
                for (key, bound) in [
                    ("gt", &bounds.gt),
                    ("gte", &bounds.gte),
                    ("lt", &bounds.lt),
                    ("lte", &bounds.lte),
                ] {
                    if let Some(v) = bound {
                        body.insert(key.to_string(), v.clone());
                    }
                }
                json!({ "range": { field.as_str(): Value::Object(body) } })
            }
            Self::Wildcard { field, pattern } => {
                json!({ "wildcard": { field.as_str(): pattern } })
            }
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::GeoShape {
                field,
                shape,
                relation,
            } => json!({
                "geo_shape": { field.as_str(): { "shape": shape, "relation": relation } }
            }),
            Self::Nested { path, query } => json!({
                "nested": { "path": path, "query": query.to_json() }
            }),
            Self::HasChild { child_type, query } => json!({
                "has_child": { "type": child_type, "query": query.to_json() }
            }),
            Self::MatchAll => json!({ "match_all": {} }),
        }
    }

    /// Wraps `self` in a `bool.must_not`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Bool(BoolQuery::new().must_not(self))
    }
}

impl Serialize for QueryDsl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for BoolQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<BoolQuery> for QueryDsl {
    fn from(query: BoolQuery) -> Self {
        Self::Bool(query)
    }
}
