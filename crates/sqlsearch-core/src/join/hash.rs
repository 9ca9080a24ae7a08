//! Hash join.
//!
//! 1. Fetch the build side with its own filter.
//! 2. Hash build rows by their composite key.
//! 3. Fetch the probe side restricted to the collected key values.
//! 4. Emit one row per probe hit and matching build row.

use tracing::{debug, info, warn};

use super::filter::matches_pair;
use super::keys::{JoinKey, KeyTable};
use super::options::JoinOptions;
use super::request_builder::{HashJoinRequestBuilder, JoinRequest};
use super::row::ResultRow;
use crate::error::{Error, Result};
use crate::sql::{JoinSelect, TableSide};
use crate::transport::{Document, SearchTransport};

/// Executes an equi-join by hashing one side.
#[derive(Debug, Clone)]
pub struct HashJoinExecutor {
    join: JoinSelect,
    options: JoinOptions,
}

impl HashJoinExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(join: JoinSelect, options: JoinOptions) -> Self {
        Self { join, options }
    }

    /// The statement.
    #[must_use]
    pub fn join(&self) -> &JoinSelect {
        &self.join
    }

    /// Resolved options.
    #[must_use]
    pub fn options(&self) -> &JoinOptions {
        &self.options
    }

    /// Requests this join would start with.
    ///
    /// # Errors
    ///
    /// Same as [`HashJoinRequestBuilder::new`], plus compile errors.
    pub fn request(&self) -> Result<JoinRequest> {
        HashJoinRequestBuilder::new(&self.join, self.options)?.build()
    }

    /// Runs the join.
    ///
    /// Predicate and key-type checks happen before the first request. An
    /// empty build side returns no rows without querying the probe side.
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedJoinPredicate`, `Error::JoinKeyMismatch` or
    ///   `Error::MalformedPredicate` on an invalid statement;
    /// - `Error::JoinSideFailure` when a side's query fails.
    pub async fn execute(&self, transport: &dyn SearchTransport) -> Result<Vec<ResultRow>> {
        let builder = HashJoinRequestBuilder::new(&self.join, self.options)?;
        if self.options.total_limit == Some(0) {
            return Ok(Vec::new());
        }

        let build_side = self.options.build_side;
        let probe_side = build_side.other();
        let build_table = self.join.table(build_side);
        let probe_table = self.join.table(probe_side);

        let build_request = builder.side_request(build_side)?;
        let build_hits = transport
            .search(&build_request)
            .await
            .map_err(|e| side_failure(&build_table.alias, &e))?;
        debug!(
            side = %build_side,
            index = %build_table.index,
            hits = build_hits.hits.len(),
            "hash join build side fetched"
        );

        let build_fields = builder.key_fields(build_side);
        let (table, skipped) = KeyTable::build(&build_hits.hits, &build_fields);
        if skipped > 0 {
            warn!(
                side = %build_side,
                skipped,
                "build rows without a complete join key were skipped"
            );
        }
        if table.is_empty() {
            info!(rows = 0, "hash join done: build side has no keys");
            return Ok(Vec::new());
        }

        let probe_fields = builder.key_fields(probe_side);
        for key in table.keys() {
            for (position, (value, field)) in key.0.iter().zip(&probe_fields).enumerate() {
                let Some(&declared) = probe_table.mapping.get(*field) else {
                    continue;
                };
                if !value.fits(declared) {
                    let build_field = format!("{}.{}", build_table.alias, build_fields[position]);
                    let build_type = value.kind().to_string();
                    let probe_field = format!("{}.{field}", probe_table.alias);
                    let probe_type = declared.as_str().to_string();
                    let (first_field, first_type, second_field, second_type) = match build_side {
                        TableSide::First => (build_field, build_type, probe_field, probe_type),
                        TableSide::Second => (probe_field, probe_type, build_field, build_type),
                    };
                    return Err(Error::JoinKeyMismatch {
                        first_field,
                        first_type,
                        second_field,
                        second_type,
                    });
                }
            }
        }

        let probe_request = builder.probe_request(&table)?;
        debug!(keys = table.keys().len(), "hash join probing");
        let probe_hits = transport
            .search(&probe_request)
            .await
            .map_err(|e| side_failure(&probe_table.alias, &e))?;

        let limit = self.options.total_limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        'probe: for probe_doc in &probe_hits.hits {
            let Some(key) = JoinKey::extract(probe_doc, &probe_fields) else {
                continue;
            };
            for &idx in table.rows(&key) {
                let build_doc = &build_hits.hits[idx];
                let (first, second) = match build_side {
                    TableSide::First => (build_doc, probe_doc),
                    TableSide::Second => (probe_doc, build_doc),
                };
                if let Some(row) = self.combine(first, second)? {
                    rows.push(row);
                    if rows.len() >= limit {
                        break 'probe;
                    }
                }
            }
        }

        info!(
            strategy = "hash_join",
            build_rows = build_hits.hits.len(),
            probe_rows = probe_hits.hits.len(),
            rows = rows.len(),
            "join done"
        );
        Ok(rows)
    }

    fn combine(&self, first: &Document, second: &Document) -> Result<Option<ResultRow>> {
        if let Some(filter) = &self.join.connected_where {
            if !matches_pair(&self.join, filter, first, second)? {
                return Ok(None);
            }
        }
        Ok(Some(ResultRow::merge(
            first,
            &self.join.first.fields,
            &self.join.second.alias,
            second,
            &self.join.second.fields,
        )))
    }
}

pub(crate) fn side_failure(alias: &str, err: &Error) -> Error {
    Error::JoinSideFailure {
        alias: alias.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
