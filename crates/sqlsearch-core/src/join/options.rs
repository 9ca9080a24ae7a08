//! Effective join parameters.
//!
//! Hints on the statement win over the statement LIMIT, which wins over
//! the configured defaults. When a hint appears twice the last one counts.

use serde::Serialize;

use crate::config::JoinConfig;
use crate::error::{Error, Result};
use crate::sql::{Hint, JoinSelect, TableSide};

/// Parameters passed to a join executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinOptions {
    /// Sub-queries per multi-search call (nested loop).
    pub batch_size: usize,
    /// Multi-search calls in flight at once (nested loop).
    pub max_concurrent_batches: usize,
    /// Max rows fetched from the first table.
    pub first_limit: usize,
    /// Max rows fetched from the second table.
    pub second_limit: usize,
    /// Side the hash join builds its key set from.
    pub build_side: TableSide,
    /// Max rows returned. `Some(0)` yields no rows without any request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_limit: Option<usize>,
}

impl JoinOptions {
    /// Resolves the options of `join` against `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a resolved size is zero.
    pub fn resolve(config: &JoinConfig, join: &JoinSelect) -> Result<Self> {
        let fallback_limit = join
            .limit
            .filter(|&limit| limit > 0)
            .unwrap_or(config.default_table_limit);
        let mut options = Self {
            batch_size: config.multi_search_max_size,
            max_concurrent_batches: config.max_concurrent_batches,
            first_limit: fallback_limit,
            second_limit: fallback_limit,
            build_side: TableSide::First,
            total_limit: join.limit,
        };

        for hint in &join.hints {
            match *hint {
                Hint::NlMultiSearchSize { size } => options.batch_size = size,
                Hint::JoinLimit { first, second } => {
                    options.first_limit = first;
                    options.second_limit = second;
                }
                Hint::HashBuildSide { side } => options.build_side = side,
                Hint::ForceNestedLoop => {}
            }
        }

        for (key, value) in [
            ("join.multi_search_max_size", options.batch_size),
            ("join.max_concurrent_batches", options.max_concurrent_batches),
            ("join.default_table_limit", fallback_limit),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{key} must be >= 1")));
            }
        }

        Ok(options)
    }

    /// Row cap for `side`.
    #[must_use]
    pub const fn limit(&self, side: TableSide) -> usize {
        match side {
            TableSide::First => self.first_limit,
            TableSide::Second => self.second_limit,
        }
    }
}
