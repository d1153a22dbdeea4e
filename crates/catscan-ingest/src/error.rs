use catscan_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The queue has been stopped and accepts no new work.
    #[error("ingestion queue is closed")]
    Closed,

    #[error("queue capacity must be greater than zero")]
    InvalidCapacity,

    #[error("failed to spawn writer thread: {0}")]
    Spawn(String),

    /// A write that reports its result back to the caller failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The writer went away before acknowledging a command.
    #[error("writer terminated unexpectedly")]
    WriterLost,
}

pub type IngestResult<T> = Result<T, IngestError>;
