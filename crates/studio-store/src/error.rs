/// Errors from key-value store operations.
///
/// Every variant means the backend could not serve the request. The ledger
/// reports all of them as "store unavailable" and never retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend refused or could not complete the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch record could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The on-disk log is damaged before its tail.
    #[error("corrupt log at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
