//! Liveness verification for catscan.
//!
//! The [`LivenessVerifier`] keeps sampling the registry and probes each
//! sampled entry's remote location with a `HEAD` request. An entry is alive
//! only if the remote host answers `200 OK`; anything else (another status,
//! a refused connection, a timeout, a failed name lookup) marks it dead and
//! it is evicted through the ingestion queue's writer.
//!
//! # Components
//!
//! - [`Probe`] -- the existence check seam; [`HttpProbe`] is the real one
//! - [`CachingResolver`] -- TTL-bounded DNS cache layered under the HTTP client
//! - [`LivenessVerifier`] -- supervisor with a bounded worker pool

pub mod config;
pub mod error;
pub mod probe;
pub mod resolver;
pub mod verifier;

pub use config::{ResolverConfig, VerifierConfig};
pub use error::{VerifierError, VerifierResult};
pub use probe::{DeadReason, HttpProbe, Probe, ProbeOutcome};
pub use resolver::{CachingResolver, Lookup, ResolverStats, SystemLookup};
pub use verifier::{BatchReport, LivenessVerifier, VerifierState, VerifierStats};
