use std::sync::Arc;

use catscan_ingest::{IngestionQueue, WriterStats};
use catscan_store::{RegistryReader, RegistryStore, SqliteRegistryStore};
use catscan_types::{Entry, Extension, FileHost, Identifier};
use catscan_verifier::{HttpProbe, LivenessVerifier, Probe, ProbeOutcome};
use tracing::info;

use crate::config::CatscanConfig;
use crate::error::{SdkError, SdkResult};

/// Largest number of links one [`Registry::random_links`] call may ask for.
pub const MAX_RANDOM_LINKS: usize = 10;

/// High-level catscan API.
///
/// Owns the store, the ingestion queue in front of it, and the liveness
/// verifier. Reads go straight to the store; every write goes through the
/// queue.
pub struct Registry {
    reader: RegistryReader,
    queue: IngestionQueue,
    probe: Arc<dyn Probe>,
    verifier: LivenessVerifier,
    host: FileHost,
    verifier_enabled: bool,
}

impl Registry {
    /// Open the SQLite registry named by `config` and start its writer.
    ///
    /// The verifier is built but not started; see
    /// [`start_verifier`](Self::start_verifier).
    pub fn open(config: &CatscanConfig) -> SdkResult<Self> {
        let store = SqliteRegistryStore::open(&config.store)?;
        let probe = HttpProbe::new(&config.verifier)?;
        Self::with_store(Arc::new(store), Arc::new(probe), config)
    }

    /// Build over an existing store and probe.
    pub fn with_store(
        store: Arc<dyn RegistryStore>,
        probe: Arc<dyn Probe>,
        config: &CatscanConfig,
    ) -> SdkResult<Self> {
        let queue = IngestionQueue::start(Arc::clone(&store), config.ingest.clone())?;
        let reader = RegistryReader::new(store);
        let verifier = LivenessVerifier::new(
            config.verifier.clone(),
            reader.clone(),
            queue.clone(),
            Arc::clone(&probe),
        )?;
        Ok(Self {
            reader,
            queue,
            probe,
            verifier,
            host: config.verifier.file_host.clone(),
            verifier_enabled: config.verifier.enabled,
        })
    }

    // ---- Ingestion ----

    /// Validate and queue an entry for insertion.
    ///
    /// Returns once the entry is queued, not once it is stored. Duplicates
    /// are accepted here and ignored by the writer.
    pub async fn ingest(&self, identifier: &str, extension: &str) -> SdkResult<Entry> {
        let entry = Entry::new(identifier, extension)?;
        self.queue.enqueue(entry.clone()).await?;
        Ok(entry)
    }

    /// Wait until everything queued so far has been written.
    pub async fn flush(&self) -> SdkResult<()> {
        Ok(self.queue.flush().await?)
    }

    // ---- Reads ----

    pub async fn count(&self) -> SdkResult<u64> {
        Ok(self.reader.count().await?)
    }

    /// Up to `n` random entries, optionally filtered by an extension.
    ///
    /// An empty result is not an error here.
    pub async fn sample(&self, n: usize, extension: Option<&str>) -> SdkResult<Vec<Entry>> {
        let filter = extension.map(Extension::filter).transpose()?;
        Ok(self.reader.sample(n, filter).await?)
    }

    /// Between 1 and [`MAX_RANDOM_LINKS`] random remote locations.
    ///
    /// Fails with [`SdkError::NotFound`] when nothing matches.
    pub async fn random_links(&self, count: usize, extension: Option<&str>) -> SdkResult<Vec<String>> {
        if !(1..=MAX_RANDOM_LINKS).contains(&count) {
            return Err(SdkError::InvalidCount(count));
        }
        let entries = self.sample(count, extension).await?;
        if entries.is_empty() {
            return Err(SdkError::NotFound);
        }
        Ok(entries.iter().map(|e| self.host.location(e)).collect())
    }

    /// Whether `identifier` is registered, whatever its extension.
    pub async fn contains(&self, identifier: &Identifier) -> SdkResult<bool> {
        Ok(self.reader.contains(identifier.clone()).await?)
    }

    pub fn link(&self, entry: &Entry) -> String {
        self.host.location(entry)
    }

    // ---- Liveness ----

    /// Probe one entry without touching the registry.
    pub async fn check(&self, entry: &Entry) -> ProbeOutcome {
        self.probe.probe(&self.host.location(entry)).await
    }

    /// Start the background verifier unless it is disabled in configuration.
    ///
    /// Returns whether it was started.
    pub fn start_verifier(&self) -> SdkResult<bool> {
        if !self.verifier_enabled {
            info!("liveness verifier disabled by configuration");
            return Ok(false);
        }
        self.verifier.start()?;
        Ok(true)
    }

    pub async fn stop_verifier(&self) {
        self.verifier.stop().await;
    }

    pub fn verifier(&self) -> &LivenessVerifier {
        &self.verifier
    }

    // ---- Lifecycle ----

    /// Stop the verifier, then drain and close the ingestion queue.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) -> SdkResult<WriterStats> {
        self.verifier.stop().await;
        Ok(self.queue.stop().await?)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("host", &self.host)
            .field("queue", &self.queue)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use catscan_ingest::IngestError;
    use catscan_store::InMemoryRegistryStore;
    use catscan_types::TypeError;
    use catscan_verifier::{DeadReason, VerifierState};

    use super::*;

    /// Dead for listed locations, alive otherwise.
    struct ListProbe(HashSet<String>);

    #[async_trait]
    impl Probe for ListProbe {
        async fn probe(&self, location: &str) -> ProbeOutcome {
            if self.0.contains(location) {
                ProbeOutcome::Dead(DeadReason::Status(404))
            } else {
                ProbeOutcome::Alive
            }
        }
    }

    fn registry_with(dead: &[&str], config: &CatscanConfig) -> Registry {
        let probe = ListProbe(dead.iter().map(|s| s.to_string()).collect());
        Registry::with_store(
            Arc::new(InMemoryRegistryStore::new()),
            Arc::new(probe),
            config,
        )
        .unwrap()
    }

    fn registry() -> Registry {
        registry_with(&[], &CatscanConfig::default())
    }

    #[tokio::test]
    async fn ingest_then_count() {
        let r = registry();
        r.ingest("abc123", "png").await.unwrap();
        r.ingest("def456", "jpg").await.unwrap();
        r.ingest("abc123", "gif").await.unwrap();
        r.flush().await.unwrap();
        assert_eq!(r.count().await.unwrap(), 2);
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn ingest_rejects_empty_fields() {
        let r = registry();
        assert!(matches!(
            r.ingest("", "png").await,
            Err(SdkError::InvalidEntry(TypeError::EmptyIdentifier))
        ));
        assert!(matches!(
            r.ingest("abc123", "").await,
            Err(SdkError::InvalidEntry(TypeError::EmptyExtension))
        ));
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn random_links_are_full_locations() {
        let r = registry();
        r.ingest("abc123", "png").await.unwrap();
        r.flush().await.unwrap();
        let links = r.random_links(5, None).await.unwrap();
        assert_eq!(links, vec!["https://files.catbox.moe/abc123.png".to_string()]);
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn random_links_filters_by_extension() {
        let r = registry();
        r.ingest("abc123", "png").await.unwrap();
        r.ingest("def456", "jpg").await.unwrap();
        r.flush().await.unwrap();
        let links = r.random_links(10, Some("jpg")).await.unwrap();
        assert_eq!(links, vec!["https://files.catbox.moe/def456.jpg".to_string()]);
        assert!(matches!(
            r.random_links(10, Some("gif")).await,
            Err(SdkError::NotFound)
        ));
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn random_links_validates_inputs() {
        let r = registry();
        assert!(matches!(r.random_links(0, None).await, Err(SdkError::InvalidCount(0))));
        assert!(matches!(r.random_links(11, None).await, Err(SdkError::InvalidCount(11))));
        assert!(matches!(
            r.random_links(1, Some("p.n/g")).await,
            Err(SdkError::InvalidEntry(TypeError::InvalidExtensionFilter(_)))
        ));
        assert!(matches!(r.random_links(1, None).await, Err(SdkError::NotFound)));
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn check_does_not_evict() {
        let r = registry_with(&["https://files.catbox.moe/def456.jpg"], &CatscanConfig::default());
        r.ingest("def456", "jpg").await.unwrap();
        r.flush().await.unwrap();
        let entry = Entry::new("def456", "jpg").unwrap();
        assert!(!r.check(&entry).await.is_alive());
        assert_eq!(r.count().await.unwrap(), 1);
        assert!(r.contains(entry.identifier()).await.unwrap());
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn verifier_prunes_dead_links() {
        let mut config = CatscanConfig::default();
        config.verifier.idle_backoff_ms = 10;
        let r = registry_with(&["https://files.catbox.moe/def456.jpg"], &config);
        r.ingest("abc123", "png").await.unwrap();
        r.ingest("def456", "jpg").await.unwrap();
        r.flush().await.unwrap();

        assert!(r.start_verifier().unwrap());
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while r.count().await.unwrap() != 1 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dead entry not evicted");

        let stats = r.shutdown().await.unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(r.verifier().state(), VerifierState::Stopped);
    }

    #[tokio::test]
    async fn disabled_verifier_is_not_started() {
        let mut config = CatscanConfig::default();
        config.verifier.enabled = false;
        let r = registry_with(&[], &config);
        assert!(!r.start_verifier().unwrap());
        assert_eq!(r.verifier().state(), VerifierState::Stopped);
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn ingest_after_shutdown_is_closed() {
        let r = registry();
        r.ingest("abc123", "png").await.unwrap();
        let stats = r.shutdown().await.unwrap();
        assert_eq!(stats.inserted, 1);
        assert!(matches!(
            r.ingest("def456", "jpg").await,
            Err(SdkError::Ingest(IngestError::Closed))
        ));
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn open_sqlite_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CatscanConfig::default();
        config.store.path = dir.path().join("links.db");

        let r = Registry::open(&config).unwrap();
        r.ingest("abc123", "png").await.unwrap();
        r.shutdown().await.unwrap();
        drop(r);

        let r = Registry::open(&config).unwrap();
        assert_eq!(r.count().await.unwrap(), 1);
        r.shutdown().await.unwrap();
    }
}
