//! Predicate compiler: condition tree to `bool` query.
//!
//! # Algorithm
//!
//! 1. Collapse single-child chains at the root.
//! 2. A leaf becomes its primitive query, wrapped in `nested` or `has_child`
//!    when scoped.
//! 3. A group becomes a fresh `bool` holding its compiled children.
//! 4. Every compiled node is attached to its parent as `must` when the
//!    node's own connector is AND and as `should` when it is OR.
//!
//! The root group is flattened into the returned query rather than wrapped
//! in an extra `bool`; both forms select the same documents.

use serde_json::Value;

use super::dsl::{BoolQuery, QueryDsl, RangeBounds};
use crate::error::{Error, Result};
use crate::sql::{Condition, Connector, Operand, Operator, Scope, Where};

/// Compiles condition trees into engine queries.
pub struct QueryMaker;

impl QueryMaker {
    /// Compiles `where_clause` as a scoring query.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if a leaf's operands do not fit
    /// its operator.
    pub fn explain(where_clause: &Where) -> Result<BoolQuery> {
        Self::compile(where_clause, false)
    }

    /// Compiles `where_clause`.
    ///
    /// With `filter_mode` the result is `{"bool": {"filter": [tree]}}`, which
    /// matches the same documents but skips relevance scoring.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if a leaf's operands do not fit
    /// its operator.
    pub fn compile(where_clause: &Where, filter_mode: bool) -> Result<BoolQuery> {
        let root = where_clause.unwrap_single();
        let mut query = BoolQuery::new();

        match root {
            Where::Group { children, .. } => {
                for child in children {
                    Self::explain_where(&mut query, child)?;
                }
            }
            Where::Leaf(_) => Self::explain_where(&mut query, root)?,
        }

        if filter_mode {
            return Ok(BoolQuery::new().filter(QueryDsl::Bool(query)));
        }
        Ok(query)
    }

    /// Compiles an optional filter; `None` yields a match-all query.
    ///
    /// # Errors
    ///
    /// See [`QueryMaker::compile`].
    pub fn compile_optional(where_clause: Option<&Where>, filter_mode: bool) -> Result<BoolQuery> {
        match where_clause {
            Some(w) => Self::compile(w, filter_mode),
            None if filter_mode => Ok(BoolQuery::new().filter(QueryDsl::MatchAll)),
            None => Ok(BoolQuery::new().must(QueryDsl::MatchAll)),
        }
    }

    fn explain_where(parent: &mut BoolQuery, node: &Where) -> Result<()> {
        match node {
            Where::Leaf(condition) => {
                let query = Self::make_condition(condition)?;
                Self::add_sub_query(parent, condition.connector, query);
            }
            Where::Group {
                connector,
                children,
            } => {
                let mut sub_query = BoolQuery::new();
                for child in children {
                    Self::explain_where(&mut sub_query, child)?;
                }
                Self::add_sub_query(parent, *connector, QueryDsl::Bool(sub_query));
            }
        }
        Ok(())
    }

    fn add_sub_query(parent: &mut BoolQuery, connector: Connector, query: QueryDsl) {
        match connector {
            Connector::And => parent.must.push(query),
            Connector::Or => parent.should.push(query),
        }
    }

    /// Builds the query for one leaf, including its scope wrapper.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` on operand mismatch.
    pub fn make_condition(condition: &Condition) -> Result<QueryDsl> {
        let query = Self::make_primitive(condition)?;
        Ok(match &condition.scope {
            Scope::Document => query,
            Scope::Nested { path } => QueryDsl::Nested {
                path: path.clone(),
                query: Box::new(query),
            },
            Scope::Child { child_type } => QueryDsl::HasChild {
                child_type: child_type.clone(),
                query: Box::new(query),
            },
        })
    }

    /// Builds the unscoped query for one leaf.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` on operand mismatch.
    pub fn make_primitive(condition: &Condition) -> Result<QueryDsl> {
        let field = condition.field.as_str();
        if field.is_empty() {
            return Err(Error::malformed(field, "empty field name"));
        }
        let values = literals(condition)?;

        let query = match condition.operator {
            Operator::Eq | Operator::Neq => {
                let value = single_scalar(condition, &values)?;
                let term = QueryDsl::Term {
                    field: field.to_string(),
                    value,
                };
                if condition.operator == Operator::Neq {
                    term.negate()
                } else {
                    term
                }
            }
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let value = single_scalar(condition, &values)?;
                let mut bounds = RangeBounds::default();
                match condition.operator {
                    Operator::Gt => bounds.gt = Some(value),
                    Operator::Gte => bounds.gte = Some(value),
                    Operator::Lt => bounds.lt = Some(value),
                    _ => bounds.lte = Some(value),
                }
                QueryDsl::Range {
                    field: field.to_string(),
                    bounds,
                }
            }
            Operator::Between | Operator::NotBetween => {
                if values.len() != 2 {
                    return Err(Error::malformed(
                        field,
                        format!(
                            "{} expects exactly 2 values, got {}",
                            condition.operator,
                            values.len()
                        ),
                    ));
                }
                for v in &values {
                    ensure_scalar(condition, v)?;
                }
                let range = QueryDsl::Range {
                    field: field.to_string(),
                    bounds: RangeBounds {
                        gte: Some(values[0].clone()),
                        lte: Some(values[1].clone()),
                        ..RangeBounds::default()
                    },
                };
                if condition.operator == Operator::NotBetween {
                    range.negate()
                } else {
                    range
                }
            }
            Operator::Like | Operator::NotLike => {
                let pattern = single_string(condition, &values)?;
                let wildcard = QueryDsl::Wildcard {
                    field: field.to_string(),
                    pattern: like_to_wildcard(&pattern),
                };
                if condition.operator == Operator::NotLike {
                    wildcard.negate()
                } else {
                    wildcard
                }
            }
            Operator::In | Operator::NotIn => {
                if values.is_empty() {
                    return Err(Error::malformed(
                        field,
                        format!("{} expects at least 1 value", condition.operator),
                    ));
                }
                for v in &values {
                    ensure_scalar(condition, v)?;
                }
                let terms = QueryDsl::Terms {
                    field: field.to_string(),
                    values,
                };
                if condition.operator == Operator::NotIn {
                    terms.negate()
                } else {
                    terms
                }
            }
            Operator::IsNull | Operator::IsNotNull => {
                if !values.is_empty() {
                    return Err(Error::malformed(
                        field,
                        format!("{} takes no value, got {}", condition.operator, values.len()),
                    ));
                }
                let exists = QueryDsl::Exists {
                    field: field.to_string(),
                };
                if condition.operator == Operator::IsNull {
                    exists.negate()
                } else {
                    exists
                }
            }
            Operator::GeoIntersects => QueryDsl::GeoShape {
                field: field.to_string(),
                shape: single_string(condition, &values)?,
                relation: "intersects".to_string(),
            },
        };

        Ok(query)
    }
}

/// Extracts literal operands; a field reference here means the predicate
/// was never bound to a row.
fn literals(condition: &Condition) -> Result<Vec<Value>> {
    condition
        .operands
        .iter()
        .map(|op| match op {
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Field(name) => Err(Error::malformed(
                &condition.field,
                format!("unbound field reference '{name}'"),
            )),
        })
        .collect()
}

fn ensure_scalar(condition: &Condition, value: &Value) -> Result<()> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
        other => Err(Error::malformed(
            &condition.field,
            format!("{} expects scalar values, got {other}", condition.operator),
        )),
    }
}

fn single_scalar(condition: &Condition, values: &[Value]) -> Result<Value> {
    match values {
        [v] => {
            ensure_scalar(condition, v)?;
            Ok(v.clone())
        }
        _ => Err(Error::malformed(
            &condition.field,
            format!(
                "{} expects exactly 1 value, got {}",
                condition.operator,
                values.len()
            ),
        )),
    }
}

fn single_string(condition: &Condition, values: &[Value]) -> Result<String> {
    match values {
        [Value::String(s)] => Ok(s.clone()),
        _ => Err(Error::malformed(
            &condition.field,
            format!("{} expects exactly 1 string value", condition.operator),
        )),
    }
}

/// Translates a SQL LIKE pattern into an engine wildcard pattern.
///
/// `%` becomes `*`, `_` becomes `?`; `\%` and `\_` stay literal, and the
/// engine's own wildcard characters are escaped.
#[must_use]
pub fn like_to_wildcard(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(esc @ ('%' | '_')) => out.push(esc),
                Some(other) => {
                    out.push_str("\\\\");
                    out.push(other);
                }
                None => out.push_str("\\\\"),
            },
            '%' => out.push('*'),
            '_' => out.push('?'),
            '*' | '?' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "maker_tests.rs"]
mod tests;
