//! Ingestion queue for catscan.
//!
//! Producers (HTTP handlers, admin commands, the liveness verifier) never
//! touch the registry's write path directly. They hand commands to an
//! [`IngestionQueue`], a bounded FIFO drained by exactly one writer thread.
//! This keeps every physical write on one thread of control, which is what
//! single-writer engines such as SQLite want, and gives a deterministic total
//! order of writes.
//!
//! - A full queue blocks producers (backpressure); nothing is dropped.
//! - A failed write is logged and the writer moves on.
//! - [`IngestionQueue::stop`] rejects new work, drains what is queued, and
//!   returns only after the last queued write has been applied.

pub mod config;
pub mod error;
pub mod queue;

pub use config::QueueConfig;
pub use error::{IngestError, IngestResult};
pub use queue::{IngestionQueue, WriterStats};
