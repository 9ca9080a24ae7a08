//! Batched nested-loop join.
//!
//! The first table drives: each of its rows yields one dependent sub-query
//! on the second table. Sub-queries go out in multi-search batches, with a
//! bounded number of batches in flight.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, warn};

use super::hash::side_failure;
use super::options::JoinOptions;
use super::request_builder::{JoinRequest, NestedLoopRequestBuilder};
use super::row::ResultRow;
use crate::error::{Error, Result};
use crate::query::SearchRequest;
use crate::sql::JoinSelect;
use crate::transport::{Document, MultiSearchItem, SearchTransport};

/// Execution phase, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedLoopState {
    /// Validating the statement.
    Init,
    /// Fetching driving rows.
    DriveFetch,
    /// Batches dispatched; the value is the batch count.
    BatchProbe(usize),
    /// Pairing driving rows with their hits.
    Merge,
    /// Finished.
    Done,
}

fn transition(from: NestedLoopState, to: NestedLoopState) -> NestedLoopState {
    debug!(?from, ?to, "nested loop state");
    to
}

/// Executes a join with one sub-query per driving row.
#[derive(Debug, Clone)]
pub struct NestedLoopExecutor {
    join: JoinSelect,
    options: JoinOptions,
}

impl NestedLoopExecutor {
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
    /// Same as [`NestedLoopRequestBuilder::new`], plus compile errors.
    pub fn request(&self) -> Result<JoinRequest> {
        NestedLoopRequestBuilder::new(&self.join, self.options)?.build()
    }

    /// Runs the join.
    ///
    /// Rows come out in driving-row order, each followed by its hits in
    /// backend order, whatever the batch size or completion order.
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedJoinPredicate` or `Error::MalformedPredicate`
    ///   on an invalid statement;
    /// - `Error::JoinSideFailure` when the driving query fails;
    /// - `Error::ProbeBatchFailure` when a multi-search batch fails. The
    ///   batches still in flight are aborted.
    pub async fn execute(&self, transport: Arc<dyn SearchTransport>) -> Result<Vec<ResultRow>> {
        let mut state = NestedLoopState::Init;
        let builder = NestedLoopRequestBuilder::new(&self.join, self.options)?;
        if self.options.total_limit == Some(0) {
            transition(state, NestedLoopState::Done);
            return Ok(Vec::new());
        }

        state = transition(state, NestedLoopState::DriveFetch);
        let drive = transport
            .search(&builder.drive_request()?)
            .await
            .map_err(|e| side_failure(&self.join.first.alias, &e))?;

        let mut rows: Vec<&Document> = Vec::with_capacity(drive.hits.len());
        let mut requests: Vec<SearchRequest> = Vec::with_capacity(drive.hits.len());
        for doc in &drive.hits {
            if let Some(request) = builder.sub_request(doc)? {
                rows.push(doc);
                requests.push(request);
            }
        }
        let dropped = drive.hits.len() - rows.len();
        if dropped > 0 {
            warn!(dropped, "driving rows without a possible match were skipped");
        }

        let batch_size = self.options.batch_size;
        let batch_count = requests.len().div_ceil(batch_size);
        state = transition(state, NestedLoopState::BatchProbe(batch_count));
        let hits = self.probe(transport, requests, batch_count).await?;

        state = transition(state, NestedLoopState::Merge);
        let limit = self.options.total_limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        'rows: for (first, matches) in rows.into_iter().zip(hits) {
            for second in &matches {
                out.push(ResultRow::merge(
                    first,
                    &self.join.first.fields,
                    &self.join.second.alias,
                    second,
                    &self.join.second.fields,
                ));
                if out.len() >= limit {
                    break 'rows;
                }
            }
        }

        transition(state, NestedLoopState::Done);
        info!(
            strategy = "nested_loop_join",
            driving_rows = drive.hits.len(),
            batches = batch_count,
            rows = out.len(),
            "join done"
        );
        Ok(out)
    }

    /// Sends `requests` in batches and returns their hits in request order.
    async fn probe(
        &self,
        transport: Arc<dyn SearchTransport>,
        requests: Vec<SearchRequest>,
        batch_count: usize,
    ) -> Result<Vec<Vec<Document>>> {
        let permits = Arc::new(Semaphore::new(self.options.max_concurrent_batches));
        let mut tasks = JoinSet::new();
        let mut task_batches: FxHashMap<Id, usize> = FxHashMap::default();
        for (batch, chunk) in requests.chunks(self.options.batch_size).enumerate() {
            let chunk = chunk.to_vec();
            let transport = Arc::clone(&transport);
            let permits = Arc::clone(&permits);
            let handle = tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Internal(format!("batch semaphore closed: {e}")))?;
                let items = transport.multi_search(&chunk).await;
                Ok::<_, Error>((batch, chunk.len(), items))
            });
            task_batches.insert(handle.id(), batch);
        }

        let mut batches: Vec<Option<Vec<Vec<Document>>>> = vec![None; batch_count];
        while let Some(joined) = tasks.join_next().await {
            let (batch, expected, items) = joined.map_err(|e| {
                let reason = format!("batch task failed: {e}");
                match task_batches.get(&e.id()) {
                    Some(&batch) => {
                        warn!(batch, %reason, "probe batch failed");
                        Error::ProbeBatchFailure { batch, reason }
                    }
                    None => Error::Internal(reason),
                }
            })??;
            let failure = |reason: String| {
                warn!(batch, %reason, "probe batch failed");
                Error::ProbeBatchFailure { batch, reason }
            };
            let items = items.map_err(|e| failure(e.to_string()))?;
            if items.len() != expected {
                return Err(failure(format!(
                    "expected {expected} responses, got {}",
                    items.len()
                )));
            }
            let mut hits = Vec::with_capacity(expected);
            for item in items {
                match item {
                    MultiSearchItem::Hits(h) => hits.push(h.hits),
                    MultiSearchItem::Failed(reason) => return Err(failure(reason)),
                }
            }
            debug!(batch, requests = expected, "probe batch done");
            batches[batch] = Some(hits);
        }

        batches
            .into_iter()
            .enumerate()
            .map(|(batch, hits)| {
                hits.ok_or_else(|| Error::Internal(format!("probe batch {batch} never completed")))
            })
            .collect::<Result<Vec<_>>>()
            .map(|b| b.into_iter().flatten().collect())
    }
}

#[cfg(test)]
#[path = "nested_loop_tests.rs"]
mod tests;
