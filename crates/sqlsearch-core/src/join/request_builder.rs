//! Per-strategy request construction for joins.
//!
//! Builders validate the statement before any I/O and produce every
//! request an execution sends. The same requests back `explain()`, so an
//! explanation always shows what would run.

use serde_json::{json, Value};

use super::filter::{bind_connected, bind_where, check_connected, connected_fields, Bound};
use super::keys::KeyTable;
use super::options::JoinOptions;
use super::selector::JoinStrategy;
use crate::error::{Error, Result};
use crate::query::{to_pretty_json, BoolQuery, QueryDsl, QueryMaker, SearchRequest};
use crate::sql::{Condition, Connector, JoinSelect, Operand, Operator, TableRef, TableSide, Where};
use crate::transport::Document;

/// The requests of a join, before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    /// Chosen algorithm.
    pub strategy: JoinStrategy,
    /// First table's own request.
    pub first: SearchRequest,
    /// Second table's own request; executions add the join filter to it.
    pub second: SearchRequest,
    /// Strategy-specific join description.
    pub join: Value,
}

impl JoinRequest {
    /// Deterministic pretty JSON of both requests and the join parameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if rendering fails.
    pub fn explain(&self) -> Result<String> {
        to_pretty_json(&json!({
            "first_table": { "index": self.first.index, "request": self.first.body() },
            "second_table": { "index": self.second.index, "request": self.second.body() },
            "join": self.join,
        }))
    }
}

/// Equality key between the two tables, aliases removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Field of the first table.
    pub first: String,
    /// Field of the second table.
    pub second: String,
}

/// Own-filter request for `table`, projecting `extra` fields on top of the
/// table's projection when it has one.
fn side_request(table: &TableRef, size: usize, extra: &[&str]) -> Result<SearchRequest> {
    let query = QueryMaker::compile_optional(table.where_clause.as_ref(), true)?;
    let mut request = SearchRequest::new(&table.index, query).with_size(size);
    if !table.fields.is_empty() {
        request = request
            .with_source(table.fields.iter().cloned())
            .with_source(extra.iter().copied());
    }
    Ok(request)
}

/// Builds the requests of a hash join.
#[derive(Debug)]
pub struct HashJoinRequestBuilder<'a> {
    join: &'a JoinSelect,
    options: JoinOptions,
    keys: Vec<KeyPair>,
}

impl<'a> HashJoinRequestBuilder<'a> {
    /// Validates `join` for hashing.
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedJoinPredicate` if an ON predicate is not an
    ///   equality between one field of each table;
    /// - `Error::JoinKeyMismatch` if declared key types are incompatible.
    pub fn new(join: &'a JoinSelect, options: JoinOptions) -> Result<Self> {
        if join.connected_conditions.is_empty() {
            return Err(Error::UnsupportedJoinPredicate(
                "hash join needs at least one equality predicate".to_string(),
            ));
        }

        let mut keys = Vec::with_capacity(join.connected_conditions.len());
        for condition in &join.connected_conditions {
            if condition.operator != Operator::Eq {
                return Err(Error::UnsupportedJoinPredicate(format!(
                    "hash join only supports '=', got '{condition}'"
                )));
            }
            let (first, second) = connected_fields(join, condition)?;
            let pair = KeyPair {
                first: first.to_string(),
                second: second.to_string(),
            };

            let first_type = join.first.mapping.get(&pair.first);
            let second_type = join.second.mapping.get(&pair.second);
            if let (Some(&a), Some(&b)) = (first_type, second_type) {
                if !a.compatible_with(b) {
                    return Err(Error::JoinKeyMismatch {
                        first_field: format!("{}.{}", join.first.alias, pair.first),
                        first_type: a.as_str().to_string(),
                        second_field: format!("{}.{}", join.second.alias, pair.second),
                        second_type: b.as_str().to_string(),
                    });
                }
            }
            keys.push(pair);
        }

        Ok(Self {
            join,
            options,
            keys,
        })
    }

    /// Key pairs in ON-clause order.
    #[must_use]
    pub fn keys(&self) -> &[KeyPair] {
        &self.keys
    }

    /// Key field names on `side`.
    #[must_use]
    pub fn key_fields(&self, side: TableSide) -> Vec<&str> {
        self.keys
            .iter()
            .map(|k| match side {
                TableSide::First => k.first.as_str(),
                TableSide::Second => k.second.as_str(),
            })
            .collect()
    }

    /// Own-filter request of `side`, sized by its limit.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if the table filter does not
    /// compile.
    pub fn side_request(&self, side: TableSide) -> Result<SearchRequest> {
        side_request(
            self.join.table(side),
            self.options.limit(side),
            &self.key_fields(side),
        )
    }

    /// Probe request: the probe side's own filter plus one `terms` filter
    /// per key field holding the build side's distinct values.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if a filter does not compile.
    pub fn probe_request(&self, build: &KeyTable) -> Result<SearchRequest> {
        let probe_side = self.options.build_side.other();
        let table = self.join.table(probe_side);
        let mut request = self.side_request(probe_side)?;

        let mut query = BoolQuery::new();
        if let Some(own) = &table.where_clause {
            query = query.filter(QueryDsl::Bool(QueryMaker::compile(own, false)?));
        }
        for (position, field) in self.key_fields(probe_side).into_iter().enumerate() {
            let values = build
                .distinct_values(position)
                .into_iter()
                .map(|v| Operand::Literal(v.to_json()))
                .collect();
            let terms = Condition::new(field, Operator::In, values);
            query = query.filter(QueryMaker::make_condition(&terms)?);
        }
        request.query = QueryDsl::Bool(query);
        Ok(request)
    }

    /// Requests and parameters for `explain()`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if a table filter does not
    /// compile.
    pub fn build(&self) -> Result<JoinRequest> {
        let keys: Vec<Value> = self
            .keys
            .iter()
            .map(|k| json!({ "first": k.first, "second": k.second }))
            .collect();
        Ok(JoinRequest {
            strategy: JoinStrategy::HashJoin,
            first: self.side_request(TableSide::First)?,
            second: self.side_request(TableSide::Second)?,
            join: json!({
                "strategy": JoinStrategy::HashJoin,
                "keys": keys,
                "build_side": self.options.build_side,
                "limits": limits(&self.options),
                "connected_where": self.join.connected_where.as_ref().map(describe),
            }),
        })
    }
}

/// Builds the requests of a nested-loop join.
#[derive(Debug)]
pub struct NestedLoopRequestBuilder<'a> {
    join: &'a JoinSelect,
    options: JoinOptions,
}

impl<'a> NestedLoopRequestBuilder<'a> {
    /// Validates the ON predicates of `join`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedJoinPredicate` for an ON predicate that
    /// does not compare one field of each table, or that cannot be rewritten
    /// with the second table's field on the left.
    pub fn new(join: &'a JoinSelect, options: JoinOptions) -> Result<Self> {
        for condition in &join.connected_conditions {
            check_connected(join, condition)?;
        }
        Ok(Self { join, options })
    }

    /// First-table fields the sub-queries read from driving rows.
    fn referenced_first_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        let mut visit = |c: &'a Condition| {
            for name in std::iter::once(c.field.as_str()).chain(c.field_operand()) {
                if let Some((TableSide::First, field)) = self.join.resolve(name) {
                    fields.push(field);
                }
            }
        };
        for condition in &self.join.connected_conditions {
            visit(condition);
        }
        if let Some(filter) = &self.join.connected_where {
            filter.for_each_condition(&mut visit);
        }
        fields
    }

    /// Driving request: the first table's own filter.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if the table filter does not
    /// compile.
    pub fn drive_request(&self) -> Result<SearchRequest> {
        side_request(
            &self.join.first,
            self.options.first_limit,
            &self.referenced_first_fields(),
        )
    }

    /// Sub-query for one driving row, or `None` when the row cannot match.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedJoinPredicate` or
    /// `Error::MalformedPredicate` if a predicate cannot be bound or
    /// compiled.
    pub fn sub_request(&self, row: &Document) -> Result<Option<SearchRequest>> {
        let mut parts: Vec<Where> = Vec::new();
        if let Some(own) = &self.join.second.where_clause {
            parts.push(own.clone());
        }
        for condition in &self.join.connected_conditions {
            match bind_connected(self.join, condition, row)? {
                Some(bound) => parts.push(bound.into()),
                None => return Ok(None),
            }
        }
        if let Some(filter) = &self.join.connected_where {
            match bind_where(self.join, filter, row)? {
                Bound::Const(false) => return Ok(None),
                Bound::Const(true) => {}
                Bound::Tree(tree) => parts.push(tree),
            }
        }

        let query = if parts.is_empty() {
            BoolQuery::new().filter(QueryDsl::MatchAll)
        } else {
            QueryMaker::compile(&Where::and(parts), true)?
        };
        let mut request =
            SearchRequest::new(&self.join.second.index, query).with_size(self.options.second_limit);
        if !self.join.second.fields.is_empty() {
            request = request.with_source(self.join.second.fields.iter().cloned());
        }
        Ok(Some(request))
    }

    /// Requests and parameters for `explain()`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if a table filter does not
    /// compile.
    pub fn build(&self) -> Result<JoinRequest> {
        let conditions: Vec<String> = self
            .join
            .connected_conditions
            .iter()
            .map(ToString::to_string)
            .collect();
        Ok(JoinRequest {
            strategy: JoinStrategy::NestedLoopJoin,
            first: self.drive_request()?,
            second: side_request(&self.join.second, self.options.second_limit, &[])?,
            join: json!({
                "strategy": JoinStrategy::NestedLoopJoin,
                "conditions": conditions,
                "batch_size": self.options.batch_size,
                "max_concurrent_batches": self.options.max_concurrent_batches,
                "limits": limits(&self.options),
                "connected_where": self.join.connected_where.as_ref().map(describe),
            }),
        })
    }
}

fn limits(options: &JoinOptions) -> Value {
    json!({
        "first": options.first_limit,
        "second": options.second_limit,
        "total": options.total_limit,
    })
}

/// SQL-like rendering of a condition tree.
fn describe(node: &Where) -> String {
    match node {
        Where::Leaf(c) => c.to_string(),
        Where::Group { children, .. } => {
            let mut out = String::from("(");
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push_str(match child.connector() {
                        Connector::And => " AND ",
                        Connector::Or => " OR ",
                    });
                }
                out.push_str(&describe(child));
            }
            out.push(')');
            out
        }
    }
}

#[cfg(test)]
#[path = "request_builder_tests.rs"]
mod tests;
