//! Foundation types for catscan.
//!
//! catscan keeps a registry of files hosted on a remote file host and prunes
//! the ones that stop resolving. Every other catscan crate depends on
//! `catscan-types`.
//!
//! # Key Types
//!
//! - [`Identifier`] -- Short token naming one remote file (unique in the registry)
//! - [`Extension`] -- File type suffix used to build the remote location
//! - [`Entry`] -- An `(identifier, extension)` pair, the only registry record
//! - [`FileHost`] -- Base URL that turns an entry into a fully-qualified link

pub mod entry;
pub mod error;
pub mod host;

pub use entry::{Entry, Extension, Identifier, MAX_FILTER_LEN};
pub use error::TypeError;
pub use host::{FileHost, DEFAULT_FILE_HOST};
