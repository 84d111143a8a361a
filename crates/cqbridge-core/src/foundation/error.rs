//! Unified error types for the cqbridge core.
//!
//! Protocol-client errors live in the adapter crate and configuration errors
//! in the runtime crate; this module covers storage and event filtering.

use thiserror::Error;

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors that can occur while persisting or loading message records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record could not be encoded or decoded.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File-system, compression or decompression I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key-value backend reported an error.
    #[error("storage backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    /// The store has already been closed.
    #[error("store is closed")]
    Closed,

    /// A blocking storage task could not be joined.
    #[error("storage task failed: {0}")]
    Task(String),
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors that can occur while compiling an event filter expression.
#[derive(Debug, Clone, Error)]
pub enum FilterError {
    /// The filter document is not valid JSON.
    #[error("filter is not valid JSON: {0}")]
    InvalidJson(String),

    /// An operator received an operand of the wrong shape.
    #[error("operator '{operator}' expects {expected}")]
    InvalidOperand {
        /// The offending operator key.
        operator: String,
        /// Human-readable description of the expected operand.
        expected: &'static str,
    },

    /// An unknown `.`-prefixed operator was used.
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    /// A `.regex` operand failed to compile.
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        /// The pattern as written in the filter.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

impl FilterError {
    /// Creates an invalid operand error.
    pub fn operand(operator: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            expected,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for filter compilation.
pub type FilterResult<T> = Result<T, FilterError>;
