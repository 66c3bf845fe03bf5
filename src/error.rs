//! Error types for proxima.

use thiserror::Error;

/// Errors that can occur during storage, indexing, or search operations.
#[derive(Debug, Error)]
pub enum ProximaError {
    /// Vector or query length differs from the store's established dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector id outside the stored range.
    #[error("vector {index} out of range (store holds {len})")]
    OutOfRange { index: usize, len: usize },

    /// Search requested on an index that has not been built.
    #[error("index is not trained")]
    NotTrained,

    /// I/O error (file operations, truncated streams).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted index data failed validation during load.
    #[error("corrupt index data: {0}")]
    CorruptIndex(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for proxima operations.
pub type Result<T> = std::result::Result<T, ProximaError>;
