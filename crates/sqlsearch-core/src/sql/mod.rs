//! Statement model consumed by the compiler and the join engine.
//!
//! Tokenizing SQL text is not this crate's job: callers (or a parser crate)
//! build these values directly. Only hints have a textual form here.

mod condition;
mod hint;
mod select;

pub use condition::{Condition, Connector, Operand, Operator, Scope, Where};
pub use hint::{Hint, HintType, TableSide};
pub use select::{FieldType, JoinSelect, OrderBy, Select, SortOrder, TableRef};

#[cfg(test)]
mod condition_tests;
