//! Two-table joins over a search backend.
//!
//! [`select`] picks the algorithm, [`JoinOptions`] carries the resolved
//! limits and batch sizes, and the executors run against any
//! [`SearchTransport`](crate::transport::SearchTransport).

pub mod filter;
pub mod hash;
pub mod keys;
pub mod nested_loop;
pub mod options;
pub mod request_builder;
pub mod row;
pub mod selector;

pub use hash::HashJoinExecutor;
pub use keys::{JoinKey, KeyTable, KeyValue};
pub use nested_loop::{NestedLoopExecutor, NestedLoopState};
pub use options::JoinOptions;
pub use request_builder::{HashJoinRequestBuilder, JoinRequest, KeyPair, NestedLoopRequestBuilder};
pub use row::ResultRow;
pub use selector::{select, JoinStrategy};
