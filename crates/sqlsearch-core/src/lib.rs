//! # sqlsearch-core
//!
//! Compiles SQL-style WHERE trees into Elasticsearch bool queries and joins
//! two indexes on top of a search backend.
//!
//! ## Features
//!
//! - **Query compiler**: AND/OR trees to `must` / `should` clauses, with
//!   nested and child-document scopes
//! - **Hash join**: equi-joins through a key set and one `terms` probe
//! - **Nested-loop join**: arbitrary comparisons through batched,
//!   concurrency-bounded multi-search calls
//! - **Explain**: deterministic JSON of every request a statement sends
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlsearch_core::{
//!     Condition, HttpTransport, JoinSelect, Operator, QueryAction, SqlSearchConfig, TableRef,
//! };
//!
//! let config = SqlSearchConfig::load()?;
//! let transport = Arc::new(HttpTransport::new(config.transport.clone())?);
//!
//! let join = JoinSelect::new(
//!     TableRef::new("users", "a"),
//!     TableRef::new("orders", "b"),
//!     vec![Condition::fields("a.id", Operator::Eq, "b.user_id")],
//! );
//! let action = QueryAction::for_join(join, &config.join)?;
//! println!("{}", action.explain()?);
//! let rows = action.execute(transport).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::redundant_pub_crate)]

pub mod action;
pub mod config;
pub mod error;
pub mod join;
pub mod logging;
pub mod query;
pub mod sql;
pub mod transport;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
pub(crate) mod testing;

pub use action::{ActionOutput, ExecutableRequest, QueryAction};
pub use config::{ConfigError, JoinConfig, LoggingConfig, SqlSearchConfig, TransportConfig};
pub use error::{Error, Result};
pub use join::{
    HashJoinExecutor, JoinOptions, JoinRequest, JoinStrategy, NestedLoopExecutor, ResultRow,
};
pub use query::{BoolQuery, DefaultQueryAction, QueryDsl, QueryMaker, SearchRequest};
pub use sql::{
    Condition, Connector, FieldType, Hint, JoinSelect, Operand, Operator, OrderBy, Scope, Select,
    SortOrder, TableRef, TableSide, Where,
};
pub use transport::{Document, HttpTransport, MultiSearchItem, SearchHits, SearchTransport};
