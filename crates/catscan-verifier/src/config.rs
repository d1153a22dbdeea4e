use std::time::Duration;

use catscan_types::FileHost;
use serde::{Deserialize, Serialize};

use crate::error::{VerifierError, VerifierResult};

/// Configuration for the [`LivenessVerifier`](crate::LivenessVerifier).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Whether the process should run the verifier at all.
    pub enabled: bool,
    /// Maximum number of check batches in flight.
    pub workers: usize,
    /// Entries sampled per batch.
    pub batch_size: usize,
    /// Host that entry locations are built against.
    pub file_host: FileHost,
    /// Upper bound on one probe, connection through response headers.
    pub probe_timeout_ms: u64,
    /// Pause taken by a batch that found nothing to check or failed to sample.
    pub idle_backoff_ms: u64,
    /// Name resolution cache under the HTTP client.
    pub dns: ResolverConfig,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 10,
            batch_size: 10,
            file_host: FileHost::default(),
            probe_timeout_ms: 10_000,
            idle_backoff_ms: 1_000,
            dns: ResolverConfig::default(),
        }
    }
}

impl VerifierConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn validate(&self) -> VerifierResult<()> {
        if self.workers == 0 {
            return Err(VerifierError::InvalidConfig("workers must be greater than zero".into()));
        }
        if self.batch_size == 0 {
            return Err(VerifierError::InvalidConfig("batch_size must be greater than zero".into()));
        }
        Ok(())
    }
}

/// TTL and size bounds for the [`CachingResolver`](crate::CachingResolver).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long a successful lookup is reused.
    pub ttl_secs: u64,
    /// Hosts kept before the soonest-expiring one is evicted.
    pub max_entries: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 1024,
        }
    }
}

impl ResolverConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
