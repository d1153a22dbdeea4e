use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::debug;

use crate::config::ResolverConfig;

/// Uncached name resolution.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolves through the operating system via tokio.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLookup;

#[async_trait]
impl Lookup for SystemLookup {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub hits: u64,
    pub misses: u64,
}

struct Cached {
    addrs: Vec<IpAddr>,
    expires_at: Instant,
}

struct Inner {
    lookup: Arc<dyn Lookup>,
    ttl: Duration,
    max_entries: usize,
    cache: RwLock<HashMap<String, Cached>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// DNS cache shared by every connection the probe client opens.
///
/// Successful lookups are reused for `ttl`. Failed lookups are not cached.
/// When the cache is full, expired hosts are purged first and then the
/// host closest to expiry is dropped.
#[derive(Clone)]
pub struct CachingResolver {
    inner: Arc<Inner>,
}

impl CachingResolver {
    /// Resolver over the system lookup.
    pub fn new(config: &ResolverConfig) -> Self {
        Self::with_lookup(config.ttl(), config.max_entries, Arc::new(SystemLookup))
    }

    pub fn with_lookup(ttl: Duration, max_entries: usize, lookup: Arc<dyn Lookup>) -> Self {
        Self {
            inner: Arc::new(Inner {
                lookup,
                ttl,
                max_entries: max_entries.max(1),
                cache: RwLock::new(HashMap::new()),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Addresses for `host`, from cache when fresh.
    pub async fn resolve_host(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let now = Instant::now();
        {
            let cache = self.inner.cache.read().expect("lock poisoned");
            if let Some(hit) = cache.get(host).filter(|c| c.expires_at > now) {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(hit.addrs.clone());
            }
        }

        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        let addrs = self.inner.lookup.lookup(host).await?;
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses for {host}"),
            ));
        }
        debug!(host, count = addrs.len(), "resolved host");

        let mut cache = self.inner.cache.write().expect("lock poisoned");
        if cache.len() >= self.inner.max_entries && !cache.contains_key(host) {
            let now = Instant::now();
            cache.retain(|_, c| c.expires_at > now);
            if cache.len() >= self.inner.max_entries {
                let soonest = cache
                    .iter()
                    .min_by_key(|(_, c)| c.expires_at)
                    .map(|(h, _)| h.clone());
                if let Some(h) = soonest {
                    cache.remove(&h);
                }
            }
        }
        cache.insert(
            host.to_string(),
            Cached {
                addrs: addrs.clone(),
                expires_at: Instant::now() + self.inner.ttl,
            },
        );
        Ok(addrs)
    }

    /// Number of cached hosts, fresh or not.
    pub fn len(&self) -> usize {
        self.inner.cache.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}

impl Resolve for CachingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let ips = resolver.resolve_host(name.as_str()).await?;
            // The connector fills in the port from the URL.
            let addrs: Addrs = Box::new(ips.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

impl std::fmt::Debug for CachingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingResolver")
            .field("ttl", &self.inner.ttl)
            .field("cached_hosts", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
