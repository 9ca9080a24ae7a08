//! Predicates that span both join tables.
//!
//! Two jobs share the same leaf semantics:
//! - [`matches_pair`] evaluates a cross-table filter on a joined pair in
//!   memory (hash join);
//! - [`bind_where`] and [`bind_connected`] substitute a driving row's values
//!   into cross-table predicates, leaving a second-table-only tree that the
//!   compiler can send (nested-loop join).
//!
//! Boolean groups follow the engine's `bool` rules: every `must` child has
//! to hold, and `should` children only count when there is no `must`.

use serde_json::Value;
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::sql::{Condition, Connector, JoinSelect, Operand, Operator, Scope, TableSide, Where};
use crate::transport::Document;

/// Evaluates `where_clause` on the pair (`first`, `second`).
///
/// # Errors
///
/// Returns `Error::UnsupportedJoinPredicate` for fields that name neither
/// table, child scopes and geo predicates, and `Error::MalformedPredicate`
/// for operand count mismatches.
pub fn matches_pair(
    join: &JoinSelect,
    where_clause: &Where,
    first: &Document,
    second: &Document,
) -> Result<bool> {
    let lookup = |field: &str| -> Result<Option<Value>> {
        let (side, name) = resolve(join, field)?;
        let doc = match side {
            TableSide::First => first,
            TableSide::Second => second,
        };
        Ok(doc.get(name).cloned())
    };
    eval_where(where_clause, &lookup)
}

fn eval_where(node: &Where, lookup: &dyn Fn(&str) -> Result<Option<Value>>) -> Result<bool> {
    match node {
        Where::Leaf(condition) => {
            let value = lookup(&condition.field)?;
            let mut operands = Vec::with_capacity(condition.operands.len());
            for operand in &condition.operands {
                match operand {
                    Operand::Literal(v) => operands.push(v.clone()),
                    Operand::Field(name) => match lookup(name)? {
                        Some(v) => operands.push(v),
                        None => return Ok(false),
                    },
                }
            }
            eval_leaf(condition, value.as_ref(), &operands)
        }
        Where::Group { children, .. } => {
            let mut has_must = false;
            let mut any_should = None;
            for child in children {
                let holds = eval_where(child, lookup)?;
                match child.connector() {
                    Connector::And => {
                        has_must = true;
                        if !holds {
                            return Ok(false);
                        }
                    }
                    Connector::Or => {
                        any_should = Some(any_should.unwrap_or(false) || holds);
                    }
                }
            }
            Ok(has_must || any_should.unwrap_or(true))
        }
    }
}

/// Result of binding a predicate to a driving row.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// The row alone decides the predicate.
    Const(bool),
    /// Predicate over second-table fields only, alias removed.
    Tree(Where),
}

/// Binds `where_clause` to a first-table `row`.
///
/// First-table-only leaves fold to constants; leaves comparing a
/// first-table field with a second-table field turn into second-table
/// leaves holding the row's value. A referenced value missing from the row
/// makes its leaf false.
///
/// # Errors
///
/// Same as [`matches_pair`], plus leaves that compare two second-table
/// fields.
pub fn bind_where(join: &JoinSelect, where_clause: &Where, row: &Document) -> Result<Bound> {
    match where_clause {
        Where::Leaf(condition) => bind_leaf(join, condition, row),
        Where::Group {
            connector,
            children,
        } => {
            let mut musts = Vec::new();
            let mut shoulds = Vec::new();
            let mut has_must = false;
            let mut should_true = false;
            for child in children {
                let bound = bind_where(join, child, row)?;
                match (child.connector(), bound) {
                    (Connector::And, Bound::Const(false)) => return Ok(Bound::Const(false)),
                    (Connector::And, Bound::Const(true)) => has_must = true,
                    (Connector::And, Bound::Tree(tree)) => {
                        has_must = true;
                        musts.push(tree);
                    }
                    (Connector::Or, Bound::Const(holds)) => should_true |= holds,
                    (Connector::Or, Bound::Tree(tree)) => shoulds.push(tree),
                }
            }

            let (kept, empty_value) = if has_must {
                (musts, true)
            } else if should_true || children.is_empty() {
                return Ok(Bound::Const(true));
            } else {
                (shoulds, false)
            };
            if kept.is_empty() {
                return Ok(Bound::Const(empty_value));
            }
            Ok(Bound::Tree(Where::Group {
                connector: *connector,
                children: kept,
            }))
        }
    }
}

fn bind_leaf(join: &JoinSelect, condition: &Condition, row: &Document) -> Result<Bound> {
    let (side, name) = resolve(join, &condition.field)?;
    let reference = condition
        .field_operand()
        .map(|f| resolve(join, f))
        .transpose()?;

    match (side, reference) {
        (TableSide::Second, None) => Ok(Bound::Tree(Where::Leaf(Condition {
            field: name.to_string(),
            ..condition.clone()
        }))),
        (TableSide::Second, Some((TableSide::First, other))) => {
            Ok(match bindable(row, other) {
                Some(value) => Bound::Tree(Where::Leaf(Condition {
                    field: name.to_string(),
                    operands: vec![Operand::Literal(value.clone())],
                    ..condition.clone()
                })),
                None => Bound::Const(false),
            })
        }
        (TableSide::First, Some((TableSide::Second, other))) => {
            let operator = condition.operator.swapped().ok_or_else(|| {
                Error::UnsupportedJoinPredicate(format!(
                    "'{condition}' cannot be rewritten with its operands swapped"
                ))
            })?;
            Ok(match bindable(row, name) {
                Some(value) => Bound::Tree(Where::Leaf(Condition {
                    connector: condition.connector,
                    field: other.to_string(),
                    operator,
                    operands: vec![Operand::Literal(value.clone())],
                    scope: condition.scope.clone(),
                })),
                None => Bound::Const(false),
            })
        }
        (TableSide::Second, Some((TableSide::Second, _))) => {
            Err(Error::UnsupportedJoinPredicate(format!(
                "'{condition}' compares two fields of the joined table"
            )))
        }
        (TableSide::First, _) => {
            let lookup = |field: &str| -> Result<Option<Value>> {
                match resolve(join, field)? {
                    (TableSide::First, name) => Ok(row.get(name).cloned()),
                    (TableSide::Second, _) => Err(Error::UnsupportedJoinPredicate(format!(
                        "'{condition}' mixes both tables in a multi-value predicate"
                    ))),
                }
            };
            eval_where(&Where::Leaf(condition.clone()), &lookup).map(Bound::Const)
        }
    }
}

/// Scalar value of `field` in `row`. Nulls, arrays and objects cannot be
/// bound into a single-value predicate, so the row gets no sub-query.
fn bindable<'d>(row: &'d Document, field: &str) -> Option<&'d Value> {
    row.get(field)
        .filter(|v| !(v.is_null() || v.is_array() || v.is_object()))
}

/// Binds one ON predicate to a first-table `row`.
///
/// Returns `None` when the row lacks the referenced value or holds an
/// array or object there.
///
/// # Errors
///
/// Returns `Error::UnsupportedJoinPredicate` unless the predicate compares
/// one field of each table with a swappable operator when written
/// second-to-first.
pub fn bind_connected(
    join: &JoinSelect,
    condition: &Condition,
    row: &Document,
) -> Result<Option<Condition>> {
    check_connected(join, condition)?;
    match bind_leaf(join, condition, row)? {
        Bound::Tree(Where::Leaf(bound)) => Ok(Some(Condition {
            connector: Connector::And,
            ..bound
        })),
        _ => Ok(None),
    }
}

/// Checks that `condition` compares a first-table field with a
/// second-table field.
///
/// # Errors
///
/// Returns `Error::UnsupportedJoinPredicate` otherwise.
pub fn check_connected(join: &JoinSelect, condition: &Condition) -> Result<()> {
    let unsupported = |why: &str| Error::UnsupportedJoinPredicate(format!("'{condition}' {why}"));

    let reference = condition
        .field_operand()
        .ok_or_else(|| unsupported("does not compare two fields"))?;
    let (side, _) = resolve(join, &condition.field)?;
    let (other_side, _) = resolve(join, reference)?;
    if side == other_side {
        return Err(unsupported("references only one table"));
    }
    if side == TableSide::First && condition.operator.swapped().is_none() {
        return Err(unsupported("cannot be rewritten with its operands swapped"));
    }
    Ok(())
}

/// Splits a checked ON predicate into its (first-table, second-table)
/// field names, aliases removed.
///
/// # Errors
///
/// See [`check_connected`].
pub fn connected_fields<'c>(
    join: &JoinSelect,
    condition: &'c Condition,
) -> Result<(&'c str, &'c str)> {
    check_connected(join, condition)?;
    let (side, name) = resolve(join, &condition.field)?;
    let reference = condition.field_operand().unwrap_or_default();
    let (_, other) = resolve(join, reference)?;
    Ok(match side {
        TableSide::First => (name, other),
        TableSide::Second => (other, name),
    })
}

fn resolve<'a>(join: &JoinSelect, field: &'a str) -> Result<(TableSide, &'a str)> {
    join.resolve(field).ok_or_else(|| {
        Error::UnsupportedJoinPredicate(format!(
            "field '{field}' is not qualified with '{}' or '{}'",
            join.first.alias, join.second.alias
        ))
    })
}

fn eval_leaf(condition: &Condition, value: Option<&Value>, operands: &[Value]) -> Result<bool> {
    if matches!(condition.scope, Scope::Child { .. }) {
        return Err(Error::UnsupportedJoinPredicate(format!(
            "'{condition}' targets child documents"
        )));
    }
    let expected = match condition.operator {
        Operator::IsNull | Operator::IsNotNull => Some(0),
        Operator::Between | Operator::NotBetween => Some(2),
        Operator::In | Operator::NotIn => None,
        _ => Some(1),
    };
    if let Some(n) = expected {
        if operands.len() != n {
            return Err(Error::malformed(
                &condition.field,
                format!("{} expects {n} value(s), got {}", condition.operator, operands.len()),
            ));
        }
    }

    let value = value.filter(|v| !v.is_null());
    let any = |pred: &dyn Fn(&Value) -> bool| match value {
        Some(Value::Array(items)) => items.iter().any(pred),
        Some(v) => pred(v),
        None => false,
    };

    let holds = match condition.operator {
        Operator::Eq => any(&|v| values_equal(v, &operands[0])),
        Operator::Neq => !any(&|v| values_equal(v, &operands[0])),
        Operator::Gt => any(&|v| compare_values(v, &operands[0]) == Some(Ordering::Greater)),
        Operator::Gte => any(&|v| {
            matches!(
                compare_values(v, &operands[0]),
                Some(Ordering::Greater | Ordering::Equal)
            )
        }),
        Operator::Lt => any(&|v| compare_values(v, &operands[0]) == Some(Ordering::Less)),
        Operator::Lte => any(&|v| {
            matches!(
                compare_values(v, &operands[0]),
                Some(Ordering::Less | Ordering::Equal)
            )
        }),
        Operator::Between | Operator::NotBetween => {
            let inside = any(&|v| in_range(v, &operands[0], &operands[1]));
            inside == (condition.operator == Operator::Between)
        }
        Operator::Like | Operator::NotLike => {
            let Some(pattern) = operands[0].as_str() else {
                return Err(Error::malformed(
                    &condition.field,
                    format!("{} expects a string pattern", condition.operator),
                ));
            };
            let found = any(&|v| v.as_str().is_some_and(|s| like_match(s, pattern)));
            found == (condition.operator == Operator::Like)
        }
        Operator::In => any(&|v| operands.iter().any(|o| values_equal(v, o))),
        Operator::NotIn => !any(&|v| operands.iter().any(|o| values_equal(v, o))),
        Operator::IsNull => value.is_none(),
        Operator::IsNotNull => value.is_some(),
        Operator::GeoIntersects => {
            return Err(Error::UnsupportedJoinPredicate(format!(
                "'{condition}' cannot be evaluated on joined rows"
            )))
        }
    };
    Ok(holds)
}

fn in_range(v: &Value, low: &Value, high: &Value) -> bool {
    matches!(
        compare_values(v, low),
        Some(Ordering::Greater | Ordering::Equal)
    ) && matches!(
        compare_values(v, high),
        Some(Ordering::Less | Ordering::Equal)
    )
}

/// Compares two JSON values for equality; numbers compare by value.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Orders numbers with numbers and strings with strings.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL LIKE matching: `%` any run, `_` one character, `\%` and `\_`
/// literal.
fn like_match(text: &str, pattern: &str) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Token {
        Any,
        One,
        Char(char),
    }

    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => Token::Char(chars.next().unwrap_or('\\')),
            '%' => Token::Any,
            '_' => Token::One,
            other => Token::Char(other),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // dp[j]: text[..i] matches tokens[..j]
    let mut dp = vec![false; tokens.len() + 1];
    dp[0] = true;
    for j in 0..tokens.len() {
        dp[j + 1] = dp[j] && tokens[j] == Token::Any;
    }
    for &ch in &text {
        let mut next = vec![false; tokens.len() + 1];
        for (j, token) in tokens.iter().enumerate() {
            next[j + 1] = match token {
                Token::Any => next[j] || dp[j + 1],
                Token::One => dp[j],
                Token::Char(c) => dp[j] && *c == ch,
            };
        }
        dp = next;
    }
    dp[tokens.len()]
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
