//! Store error types.

use thiserror::Error;

/// Result type for key-value and history store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing the history record.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend error.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend worker stopped and no longer answers requests.
    #[error("storage worker is gone")]
    WorkerGone,

    /// The history list could not be encoded.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Anything else: a bug, not a storage condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Storage conditions that readers recover from by treating the record as empty.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Io(_) | StoreError::Backend(_) | StoreError::WorkerGone => true,
            StoreError::Serialize(_) | StoreError::Internal(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Internal("bad state".to_string());
        assert_eq!(err.to_string(), "internal error: bad state");
    }

    #[test]
    fn io_and_worker_errors_are_transient() {
        let io = StoreError::from(std::io::Error::new(std::io::ErrorKind::Other, "locked"));
        assert!(io.is_transient());
        assert!(StoreError::WorkerGone.is_transient());
        assert!(!StoreError::Internal("x".into()).is_transient());
    }
}
