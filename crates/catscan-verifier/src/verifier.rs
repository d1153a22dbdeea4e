use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use catscan_ingest::IngestionQueue;
use catscan_store::RegistryReader;
use catscan_types::{Entry, FileHost};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::VerifierConfig;
use crate::error::{VerifierError, VerifierResult};
use crate::probe::{DeadReason, Probe, ProbeOutcome};

/// Lifecycle of a [`LivenessVerifier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifierState {
    Stopped,
    Running,
    Stopping,
}

/// Cumulative counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerifierStats {
    /// Sample reads attempted.
    pub samples: u64,
    /// Sample reads that failed with a storage fault.
    pub sample_failures: u64,
    pub probes: u64,
    pub alive: u64,
    /// Dead entries actually removed from the registry.
    pub evicted: u64,
    /// Dead entries whose removal failed.
    pub eviction_failures: u64,
}

/// Outcome of a single check batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sampled: usize,
    pub alive: usize,
    pub dead: usize,
    pub evicted: Vec<Entry>,
}

#[derive(Default)]
struct Counters {
    samples: AtomicU64,
    sample_failures: AtomicU64,
    probes: AtomicU64,
    alive: AtomicU64,
    evicted: AtomicU64,
    eviction_failures: AtomicU64,
}

struct Inner {
    reader: RegistryReader,
    queue: IngestionQueue,
    probe: Arc<dyn Probe>,
    host: FileHost,
    config: VerifierConfig,
    state: watch::Sender<VerifierState>,
    running: watch::Sender<bool>,
    counters: Counters,
}

/// Background auditor that samples the registry, probes each sampled entry,
/// and evicts the dead ones.
///
/// At most `workers` batches run at once. The supervisor waits for a free
/// worker before scheduling the next batch, and a batch that has nothing to
/// check pauses for `idle_backoff` before giving its worker back, so the
/// supervisor never spins.
pub struct LivenessVerifier {
    inner: Arc<Inner>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl LivenessVerifier {
    /// Build a stopped verifier. Removals go through `queue`; reads through
    /// `reader`.
    pub fn new(
        config: VerifierConfig,
        reader: RegistryReader,
        queue: IngestionQueue,
        probe: Arc<dyn Probe>,
    ) -> VerifierResult<Self> {
        config.validate()?;
        let (state, _) = watch::channel(VerifierState::Stopped);
        let (running, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(Inner {
                reader,
                queue,
                probe,
                host: config.file_host.clone(),
                config,
                state,
                running,
                counters: Counters::default(),
            }),
            supervisor: Mutex::new(None),
        })
    }

    pub fn state(&self) -> VerifierState {
        *self.inner.state.borrow()
    }

    /// Transition `Stopped -> Running` and spawn the supervisor loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> VerifierResult<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| VerifierError::NoRuntime)?;
        let mut result = Ok(());
        self.inner.state.send_if_modified(|state| {
            if *state != VerifierState::Stopped {
                result = Err(VerifierError::NotStopped(*state));
                return false;
            }
            self.inner.running.send_replace(true);
            let handle = runtime.spawn(supervise(Arc::clone(&self.inner)));
            *self.supervisor.lock().expect("supervisor lock poisoned") = Some(handle);
            *state = VerifierState::Running;
            true
        });
        result?;
        info!(
            workers = self.inner.config.workers,
            batch_size = self.inner.config.batch_size,
            host = %self.inner.host,
            "liveness verifier started"
        );
        Ok(())
    }

    /// Transition `Running -> Stopping -> Stopped`.
    ///
    /// Scheduling stops at once and batches skip their remaining entries.
    /// Probes already in flight finish or time out before this returns.
    /// Every caller returns only once the verifier is `Stopped`, including
    /// callers that arrive while another stop is in progress. Stopping a
    /// stopped verifier is a no-op.
    pub async fn stop(&self) {
        let began = self.inner.state.send_if_modified(|state| {
            if *state != VerifierState::Running {
                return false;
            }
            *state = VerifierState::Stopping;
            true
        });
        if !began {
            let mut state = self.inner.state.subscribe();
            let _ = state.wait_for(|s| *s != VerifierState::Stopping).await;
            return;
        }
        self.inner.running.send_replace(false);

        let handle = self.supervisor.lock().expect("supervisor lock poisoned").take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "verifier supervisor panicked");
            }
        }
        self.inner.state.send_replace(VerifierState::Stopped);
        let stats = self.stats();
        info!(
            probes = stats.probes,
            evicted = stats.evicted,
            "liveness verifier stopped"
        );
    }

    /// Run one check batch on the calling task, regardless of state.
    pub async fn check_once(&self) -> BatchReport {
        self.inner.run_batch(false).await
    }

    pub fn stats(&self) -> VerifierStats {
        let c = &self.inner.counters;
        VerifierStats {
            samples: c.samples.load(Ordering::Relaxed),
            sample_failures: c.sample_failures.load(Ordering::Relaxed),
            probes: c.probes.load(Ordering::Relaxed),
            alive: c.alive.load(Ordering::Relaxed),
            evicted: c.evicted.load(Ordering::Relaxed),
            eviction_failures: c.eviction_failures.load(Ordering::Relaxed),
        }
    }
}

impl Drop for LivenessVerifier {
    fn drop(&mut self) {
        // The supervisor holds its own `Inner`; tell it to wind down.
        self.inner.running.send_replace(false);
    }
}

impl std::fmt::Debug for LivenessVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessVerifier")
            .field("state", &self.state())
            .field("host", &self.inner.host)
            .finish_non_exhaustive()
    }
}

/// Schedule batches onto the worker pool until told to stop, then wait for
/// the batches in flight.
async fn supervise(inner: Arc<Inner>) {
    let workers = Arc::new(Semaphore::new(inner.config.workers));
    let mut batches = JoinSet::new();
    let mut running = inner.running.subscribe();

    loop {
        tokio::select! {
            biased;
            _ = running.wait_for(|r| !*r) => break,
            Some(joined) = batches.join_next(), if !batches.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "check batch panicked");
                }
            }
            permit = Arc::clone(&workers).acquire_owned() => {
                let Ok(permit) = permit else { break };
                let inner = Arc::clone(&inner);
                batches.spawn(async move {
                    inner.run_batch(true).await;
                    drop(permit);
                });
            }
        }
    }

    debug!(in_flight = batches.len(), "supervisor waiting for batches");
    while let Some(joined) = batches.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "check batch panicked");
        }
    }
}

impl Inner {
    fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    async fn run_batch(&self, supervised: bool) -> BatchReport {
        let mut report = BatchReport::default();

        self.counters.samples.fetch_add(1, Ordering::Relaxed);
        let entries = match self.reader.sample(self.config.batch_size, None).await {
            Ok(entries) => entries,
            Err(e) => {
                self.counters.sample_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "failed to sample entries for liveness check");
                if supervised {
                    self.idle().await;
                }
                return report;
            }
        };
        report.sampled = entries.len();
        if entries.is_empty() {
            if supervised {
                self.idle().await;
            }
            return report;
        }

        for entry in entries {
            if supervised && !self.is_running() {
                break;
            }
            let location = self.host.location(&entry);
            let outcome = self.probe.probe(&location).await;
            self.counters.probes.fetch_add(1, Ordering::Relaxed);
            match outcome {
                ProbeOutcome::Alive => {
                    report.alive += 1;
                    self.counters.alive.fetch_add(1, Ordering::Relaxed);
                }
                ProbeOutcome::Dead(reason) => {
                    report.dead += 1;
                    if self.evict(&entry, &location, &reason).await {
                        report.evicted.push(entry);
                    }
                }
            }
        }
        report
    }

    async fn evict(&self, entry: &Entry, location: &str, reason: &DeadReason) -> bool {
        match self.queue.remove(entry.clone()).await {
            Ok(true) => {
                self.counters.evicted.fetch_add(1, Ordering::Relaxed);
                info!(
                    identifier = %entry.identifier(),
                    extension = %entry.extension(),
                    location,
                    reason = %reason,
                    "evicted dead entry"
                );
                true
            }
            // Another batch got there first.
            Ok(false) => {
                debug!(identifier = %entry.identifier(), "dead entry already removed");
                false
            }
            Err(e) => {
                self.counters.eviction_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    identifier = %entry.identifier(),
                    location,
                    error = %e,
                    "failed to evict dead entry"
                );
                false
            }
        }
    }

    /// Sleep for the idle backoff, waking early on stop.
    async fn idle(&self) {
        let mut running = self.running.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(self.config.idle_backoff()) => {}
            _ = running.wait_for(|r| !*r) => {}
        }
    }
}
