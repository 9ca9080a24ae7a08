//! Join strategy selection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sql::{HintType, JoinSelect, Operator};

/// Physical join algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Key set from one side, `terms` filter on the other.
    HashJoin,
    /// Dependent sub-query per driving row, batched through multi-search.
    NestedLoopJoin,
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HashJoin => "hash_join",
            Self::NestedLoopJoin => "nested_loop_join",
        })
    }
}

/// Picks the join algorithm for `join`.
///
/// Rules, first match wins:
/// 1. an empty ON clause (cross join) or any ON predicate other than `=`
///    needs a nested loop;
/// 2. a `FORCE_NESTED_LOOP` hint asks for one;
/// 3. otherwise hash join.
#[must_use]
pub fn select(join: &JoinSelect) -> JoinStrategy {
    if join.connected_conditions.is_empty()
        || join
            .connected_conditions
            .iter()
            .any(|c| c.operator != Operator::Eq)
    {
        return JoinStrategy::NestedLoopJoin;
    }
    if join
        .hints
        .iter()
        .any(|h| h.hint_type() == HintType::ForceNestedLoop)
    {
        return JoinStrategy::NestedLoopJoin;
    }
    JoinStrategy::HashJoin
}
