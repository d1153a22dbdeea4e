//! High-level API for catscan.
//!
//! [`Registry`] is the entry point for applications: it opens the store,
//! starts the ingestion queue, and owns the liveness verifier. Everything is
//! configured from one [`CatscanConfig`] value.

pub mod config;
pub mod error;
pub mod registry;

pub use config::{CatscanConfig, ServerConfig, DOTENV_FILE};
pub use error::{SdkError, SdkResult};
pub use registry::{Registry, MAX_RANDOM_LINKS};

// Re-export key types
pub use catscan_ingest::{QueueConfig, WriterStats};
pub use catscan_store::{RegistryStore, SqliteStoreConfig};
pub use catscan_types::{Entry, Extension, FileHost, Identifier};
pub use catscan_verifier::{
    DeadReason, Probe, ProbeOutcome, VerifierConfig, VerifierState, VerifierStats,
};
