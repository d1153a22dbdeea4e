/// Errors from registry storage operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing medium could not be opened or the schema could not be
    /// ensured. Fatal at startup.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write was abandoned because of a storage fault.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// A read was abandoned because of a storage fault.
    #[error("read failed: {0}")]
    ReadFailed(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
