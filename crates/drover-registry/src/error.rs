//! Registry error types
//!
//! Explicit error variants with context.

use thiserror::Error;

/// Registry-specific errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Invalid node address
    #[error("invalid node address: {address}, reason: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Invalid registry identifier
    #[error("invalid registry id: {id}, reason: {reason}")]
    InvalidId { id: String, reason: String },

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised by storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failure
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("storage codec error: {reason}")]
    Codec { reason: String },

    /// Recovered log contained an inconsistent transition
    #[error("corrupt transition log at record {record}: {reason}")]
    CorruptLog { record: usize, reason: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
