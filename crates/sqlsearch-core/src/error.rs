//! Error types for `sqlsearch`.
//!
//! Compilation errors (`MalformedPredicate`, `UnsupportedJoinPredicate`,
//! `JoinKeyMismatch`, `InvalidHint`) are raised before any request leaves
//! the process. Execution errors carry the side or batch that failed so the
//! caller can log them. Nothing in this crate retries.

use thiserror::Error;

/// Result type alias for `sqlsearch` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling or executing a statement.
///
/// Error codes follow the pattern `SQLS-XXX`.
#[derive(Error, Debug)]
pub enum Error {
    /// Operator and operand arity/type disagree (SQLS-001).
    #[error("[SQLS-001] Malformed predicate on '{field}': {message}")]
    MalformedPredicate {
        /// Field of the offending condition.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// Join key fields have incompatible types (SQLS-002).
    #[error("[SQLS-002] Join key mismatch: '{first_field}' ({first_type}) cannot be compared with '{second_field}' ({second_type})")]
    JoinKeyMismatch {
        /// Key field on the first table.
        first_field: String,
        /// Type of the first key field.
        first_type: String,
        /// Key field on the second table.
        second_field: String,
        /// Type of the second key field.
        second_type: String,
    },

    /// A multi-search batch of a nested-loop join failed (SQLS-003).
    #[error("[SQLS-003] Probe batch {batch} failed: {reason}")]
    ProbeBatchFailure {
        /// Zero-based batch index in submission order.
        batch: usize,
        /// Underlying failure.
        reason: String,
    },

    /// The query of one join side failed (SQLS-004).
    #[error("[SQLS-004] Query on join side '{alias}' failed: {reason}")]
    JoinSideFailure {
        /// Alias of the table whose query failed.
        alias: String,
        /// Underlying failure.
        reason: String,
    },

    /// A join predicate cannot be executed by the chosen strategy (SQLS-005).
    #[error("[SQLS-005] Unsupported join predicate: {0}")]
    UnsupportedJoinPredicate(String),

    /// A hint could not be parsed (SQLS-006).
    #[error("[SQLS-006] Invalid hint: {0}")]
    InvalidHint(String),

    /// Backend call failed (SQLS-007).
    #[error("[SQLS-007] Transport error: {0}")]
    Transport(String),

    /// Configuration error (SQLS-008).
    #[error("[SQLS-008] Configuration error: {0}")]
    Config(String),

    /// Serialization error (SQLS-009).
    #[error("[SQLS-009] Serialization error: {0}")]
    Serialization(String),

    /// Internal error (SQLS-010).
    ///
    /// Indicates an unexpected internal error. Please report if encountered.
    #[error("[SQLS-010] Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g., "SQLS-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedPredicate { .. } => "SQLS-001",
            Self::JoinKeyMismatch { .. } => "SQLS-002",
            Self::ProbeBatchFailure { .. } => "SQLS-003",
            Self::JoinSideFailure { .. } => "SQLS-004",
            Self::UnsupportedJoinPredicate(_) => "SQLS-005",
            Self::InvalidHint(_) => "SQLS-006",
            Self::Transport(_) => "SQLS-007",
            Self::Config(_) => "SQLS-008",
            Self::Serialization(_) => "SQLS-009",
            Self::Internal(_) => "SQLS-010",
        }
    }

    /// Returns true if re-issuing the same statement may succeed.
    ///
    /// Only backend failures qualify; compilation errors are deterministic.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ProbeBatchFailure { .. } | Self::JoinSideFailure { .. }
        )
    }

    /// Shorthand for [`Error::MalformedPredicate`].
    pub(crate) fn malformed(field: &str, message: impl Into<String>) -> Self {
        Self::MalformedPredicate {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
