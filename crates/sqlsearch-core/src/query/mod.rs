//! Query compilation: condition trees to search requests.

pub mod dsl;
pub mod maker;
pub mod request;
pub mod single;

pub use dsl::{BoolQuery, QueryDsl, RangeBounds};
pub use maker::{like_to_wildcard, QueryMaker};
pub use request::{to_pretty_json, SearchRequest};
pub use single::DefaultQueryAction;
