//! Statement dispatch.
//!
//! A [`QueryAction`] is what a parsed statement turns into: a single-table
//! request or one of the two join executors. All three explain, build and
//! execute through the same interface.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::JoinConfig;
use crate::error::Result;
use crate::join::{
    select, HashJoinExecutor, JoinOptions, JoinRequest, JoinStrategy, NestedLoopExecutor,
    ResultRow,
};
use crate::query::{DefaultQueryAction, SearchRequest};
use crate::sql::{JoinSelect, Select};
use crate::transport::{SearchHits, SearchTransport};

/// An executable statement.
#[derive(Debug, Clone)]
pub enum QueryAction {
    /// Single-table SELECT.
    SingleTable(DefaultQueryAction),
    /// Equi-join by key set.
    HashJoin(HashJoinExecutor),
    /// Join by per-row sub-queries.
    NestedLoopJoin(NestedLoopExecutor),
}

/// Requests an action would send first.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutableRequest {
    /// One search.
    Search(SearchRequest),
    /// Both sides of a join.
    Join(JoinRequest),
}

/// Result of [`QueryAction::execute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    /// Hits of a single-table search.
    Hits(SearchHits),
    /// Joined rows.
    Rows(Vec<ResultRow>),
}

impl QueryAction {
    /// Wraps a single-table statement.
    #[must_use]
    pub fn for_select(select: Select) -> Self {
        Self::SingleTable(DefaultQueryAction::new(select))
    }

    /// Resolves options and picks the strategy for a join.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the resolved options are invalid.
    pub fn for_join(join: JoinSelect, config: &JoinConfig) -> Result<Self> {
        let options = JoinOptions::resolve(config, &join)?;
        let strategy = select(&join);
        debug!(%strategy, first = %join.first.index, second = %join.second.index, "join planned");
        Ok(match strategy {
            JoinStrategy::HashJoin => Self::HashJoin(HashJoinExecutor::new(join, options)),
            JoinStrategy::NestedLoopJoin => {
                Self::NestedLoopJoin(NestedLoopExecutor::new(join, options))
            }
        })
    }

    /// Join strategy, if this is a join.
    #[must_use]
    pub fn strategy(&self) -> Option<JoinStrategy> {
        match self {
            Self::SingleTable(_) => None,
            Self::HashJoin(_) => Some(JoinStrategy::HashJoin),
            Self::NestedLoopJoin(_) => Some(JoinStrategy::NestedLoopJoin),
        }
    }

    /// Builds the requests without sending them.
    ///
    /// # Errors
    ///
    /// Returns the validation or compile error of the statement.
    pub fn to_request(&self) -> Result<ExecutableRequest> {
        Ok(match self {
            Self::SingleTable(action) => ExecutableRequest::Search(action.to_request()?),
            Self::HashJoin(executor) => ExecutableRequest::Join(executor.request()?),
            Self::NestedLoopJoin(executor) => ExecutableRequest::Join(executor.request()?),
        })
    }

    /// Deterministic pretty JSON of what [`QueryAction::execute`] would
    /// send.
    ///
    /// # Errors
    ///
    /// See [`QueryAction::to_request`].
    pub fn explain(&self) -> Result<String> {
        match self.to_request()? {
            ExecutableRequest::Search(request) => request.explain(),
            ExecutableRequest::Join(request) => request.explain(),
        }
    }

    /// Runs the statement.
    ///
    /// # Errors
    ///
    /// Returns validation errors before any request, and transport errors
    /// wrapped per strategy.
    pub async fn execute(&self, transport: Arc<dyn SearchTransport>) -> Result<ActionOutput> {
        match self {
            Self::SingleTable(action) => {
                let request = action.to_request()?;
                Ok(ActionOutput::Hits(transport.search(&request).await?))
            }
            Self::HashJoin(executor) => {
                Ok(ActionOutput::Rows(executor.execute(transport.as_ref()).await?))
            }
            Self::NestedLoopJoin(executor) => {
                Ok(ActionOutput::Rows(executor.execute(transport).await?))
            }
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
