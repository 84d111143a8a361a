//! Runtime error types.

use cqbridge_core::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bringing the bridge up.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded, validated or applied.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The message database could not be opened.
    #[error("Failed to open message database: {0}")]
    Store(#[from] StoreError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
