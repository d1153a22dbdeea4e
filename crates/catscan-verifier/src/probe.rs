use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::VerifierConfig;
use crate::error::{VerifierError, VerifierResult};
use crate::resolver::CachingResolver;

/// Why a probe classified a location as dead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeadReason {
    /// The host answered with something other than `200 OK`.
    Status(u16),
    /// No answer: connection, name resolution, TLS, or timeout failure.
    Unreachable(String),
}

impl fmt::Display for DeadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "status {code}"),
            Self::Unreachable(why) => write!(f, "unreachable: {why}"),
        }
    }
}

/// Result of one existence check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Alive,
    Dead(DeadReason),
}

impl ProbeOutcome {
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// Lightweight existence check against a remote location.
///
/// Implementations never fail: every problem is a [`ProbeOutcome::Dead`].
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, location: &str) -> ProbeOutcome;
}

/// `HEAD`-request probe over a pooled HTTP client.
///
/// Connections are kept alive and reused across probes to the same host,
/// and name lookups go through a shared [`CachingResolver`].
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
    resolver: CachingResolver,
}

impl HttpProbe {
    pub fn new(config: &VerifierConfig) -> VerifierResult<Self> {
        Self::with_resolver(config, CachingResolver::new(&config.dns))
    }

    pub fn with_resolver(config: &VerifierConfig, resolver: CachingResolver) -> VerifierResult<Self> {
        let client = Client::builder()
            .timeout(config.probe_timeout())
            .pool_max_idle_per_host(config.workers)
            .dns_resolver(Arc::new(resolver.clone()))
            .user_agent(concat!("catscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VerifierError::Client(e.to_string()))?;
        Ok(Self { client, resolver })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, location: &str) -> ProbeOutcome {
        match self.client.head(location).send().await {
            Ok(response) if response.status() == StatusCode::OK => ProbeOutcome::Alive,
            Ok(response) => ProbeOutcome::Dead(DeadReason::Status(response.status().as_u16())),
            Err(e) => {
                debug!(location, error = %e, "probe failed");
                ProbeOutcome::Dead(DeadReason::Unreachable(e.to_string()))
            }
        }
    }
}

impl fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProbe")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
