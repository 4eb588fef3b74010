//! Error types for the orchestration layer.

use ember_core::enums::BatchStatus;
use thiserror::Error;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] ember_store::StoreError),

    /// Input rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An operation was requested against a batch in the wrong status.
    #[error("batch {batch_id} is {status}; cannot {operation}")]
    BatchState {
        /// Batch ID.
        batch_id: String,
        /// Current status.
        status: BatchStatus,
        /// The refused operation.
        operation: &'static str,
    },
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
