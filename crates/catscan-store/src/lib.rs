//! Registry storage for catscan.
//!
//! The registry is a single relation of `(identifier, extension)` pairs with a
//! uniqueness constraint on the identifier. This crate defines the storage
//! contract and its backends; it never decides *when* to write. All writes are
//! funnelled through the ingestion queue's single writer (see
//! `catscan-ingest`), while reads go through [`RegistryReader`].
//!
//! # Storage Backends
//!
//! All backends implement the [`RegistryStore`] trait:
//!
//! - [`SqliteRegistryStore`] -- durable SQLite file in WAL mode
//! - [`InMemoryRegistryStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Uniqueness on identifier is enforced by the backend, not by callers.
//! 2. Inserting a present identifier is a silent no-op.
//! 3. Removing an absent entry is a silent no-op.
//! 4. Sampling returns at most `n` entries, and fewer is not an error.
//! 5. Stored order carries no meaning.

pub mod error;
pub mod memory;
pub mod reader;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryRegistryStore;
pub use reader::RegistryReader;
pub use sqlite::{SqliteRegistryStore, SqliteStoreConfig};
pub use traits::RegistryStore;
