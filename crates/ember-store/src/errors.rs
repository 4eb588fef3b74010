//! Error types for the persistence layer.
//!
//! [`StoreError`] is the primary error type returned by all store
//! operations. Specific variants cover the common failure modes while
//! keeping the surface small enough for exhaustive matching.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested profile was not found.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// Requested batch was not found.
    #[error("batch not found: {0}")]
    BatchNotFound(String),

    /// Requested session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Requested action was not found.
    #[error("action not found: {0}")]
    ActionNotFound(String),

    /// A status change violated the lifecycle state machine.
    #[error("illegal transition for {entity} {id}: {from} -> {to}")]
    IllegalTransition {
        /// Entity kind ("batch" or "session").
        entity: &'static str,
        /// Entity ID.
        id: String,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Write refused because the owning batch is in a terminal status.
    #[error("batch {0} is terminal; no further session activity may be persisted")]
    BatchTerminal(String),

    /// Invalid operation on the store.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn batch_not_found_display() {
        let err = StoreError::BatchNotFound("batch-123".into());
        assert_eq!(err.to_string(), "batch not found: batch-123");
    }

    #[test]
    fn illegal_transition_display() {
        let err = StoreError::IllegalTransition {
            entity: "batch",
            id: "batch-1".into(),
            from: "completed".into(),
            to: "running".into(),
        };
        assert_eq!(
            err.to_string(),
            "illegal transition for batch batch-1: completed -> running"
        );
    }

    #[test]
    fn batch_terminal_display() {
        let err = StoreError::BatchTerminal("batch-9".into());
        assert!(err.to_string().contains("terminal"));
    }
}
