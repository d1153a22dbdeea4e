use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use catscan_store::{RegistryStore, StoreResult};
use catscan_types::Entry;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::QueueConfig;
use crate::error::{IngestError, IngestResult};

/// A command for the writer thread.
enum WriteCommand {
    /// Insert unless the identifier is present. Fire-and-forget.
    Insert(Entry),
    /// Delete the matching row and report the outcome.
    Remove {
        entry: Entry,
        ack: oneshot::Sender<StoreResult<bool>>,
    },
    /// Acknowledge once every earlier command has been applied.
    Flush { ack: oneshot::Sender<()> },
}

/// Counters maintained by the writer thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Rows added by `Insert` commands.
    pub inserted: u64,
    /// `Insert` commands whose identifier was already present.
    pub duplicates: u64,
    /// Rows deleted by `Remove` commands.
    pub removed: u64,
    /// Commands that failed with a storage fault.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    inserted: AtomicU64,
    duplicates: AtomicU64,
    removed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> WriterStats {
        WriterStats {
            inserted: self.inserted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// State touched by the writer thread. Kept apart from the sender so that
/// dropping every queue handle closes the channel.
#[derive(Default)]
struct WriterState {
    pending: AtomicUsize,
    counters: Counters,
}

struct Shared {
    /// `None` once stop has begun. Producers hold a read guard while sending,
    /// so taking the write guard waits out in-flight sends.
    sender: RwLock<Option<mpsc::Sender<WriteCommand>>>,
    /// Fires when the writer thread exits.
    finished: Mutex<Option<oneshot::Receiver<()>>>,
    capacity: usize,
    state: Arc<WriterState>,
}

/// Bounded FIFO of registry writes with a single consumer.
///
/// Cloning is cheap; all clones feed the same writer.
#[derive(Clone)]
pub struct IngestionQueue {
    shared: Arc<Shared>,
}

impl IngestionQueue {
    /// Spawn the writer thread and return a handle for producers.
    pub fn start(store: Arc<dyn RegistryStore>, config: QueueConfig) -> IngestResult<Self> {
        if config.capacity == 0 {
            return Err(IngestError::InvalidCapacity);
        }
        let (tx, rx) = mpsc::channel(config.capacity);
        let (finished_tx, finished_rx) = oneshot::channel();
        let state = Arc::new(WriterState::default());
        let shared = Arc::new(Shared {
            sender: RwLock::new(Some(tx)),
            finished: Mutex::new(Some(finished_rx)),
            capacity: config.capacity,
            state: Arc::clone(&state),
        });

        thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                writer_loop(store.as_ref(), rx, &state);
                let _ = finished_tx.send(());
            })
            .map_err(|e| IngestError::Spawn(e.to_string()))?;

        info!(capacity = config.capacity, "ingestion queue started");
        Ok(Self { shared })
    }

    /// Queue an entry for insertion.
    ///
    /// Waits for space when the queue is full. Fails with
    /// [`IngestError::Closed`] once [`stop`](Self::stop) has begun.
    pub async fn enqueue(&self, entry: Entry) -> IngestResult<()> {
        self.send(WriteCommand::Insert(entry)).await
    }

    /// Queue a removal and wait until the writer has applied it.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn remove(&self, entry: Entry) -> IngestResult<bool> {
        let (ack, done) = oneshot::channel();
        self.send(WriteCommand::Remove { entry, ack }).await?;
        let removed = done.await.map_err(|_| IngestError::WriterLost)??;
        Ok(removed)
    }

    /// Wait until every command queued before this call has been applied.
    pub async fn flush(&self) -> IngestResult<()> {
        let (ack, done) = oneshot::channel();
        self.send(WriteCommand::Flush { ack }).await?;
        done.await.map_err(|_| IngestError::WriterLost)
    }

    async fn send(&self, command: WriteCommand) -> IngestResult<()> {
        let guard = self.shared.sender.read().await;
        let sender = guard.as_ref().ok_or(IngestError::Closed)?;
        // Counted before the send so the writer never decrements first.
        self.shared.state.pending.fetch_add(1, Ordering::AcqRel);
        let mut pending = PendingGuard(Some(&self.shared.state.pending));
        if sender.send(command).await.is_err() {
            return Err(IngestError::WriterLost);
        }
        pending.disarm();
        Ok(())
    }

    /// Stop accepting commands, drain everything already queued, and wait
    /// for the writer thread to exit.
    ///
    /// Safe to call more than once; later calls wait for the same drain.
    pub async fn stop(&self) -> IngestResult<WriterStats> {
        let sender = self.shared.sender.write().await.take();
        if sender.is_some() {
            info!(pending = self.pending(), "ingestion queue stopping, draining");
        }
        // Dropping the only sender lets the writer run dry and exit.
        drop(sender);

        let mut finished = self.shared.finished.lock().await;
        if let Some(rx) = finished.take() {
            rx.await.map_err(|_| IngestError::WriterLost)?;
            let stats = self.stats();
            info!(
                inserted = stats.inserted,
                duplicates = stats.duplicates,
                removed = stats.removed,
                failed = stats.failed,
                "ingestion queue drained"
            );
        }
        Ok(self.stats())
    }

    /// Commands queued or waiting for space.
    pub fn pending(&self) -> usize {
        self.shared.state.pending.load(Ordering::Acquire)
    }

    pub async fn is_closed(&self) -> bool {
        self.shared.sender.read().await.is_none()
    }

    pub fn stats(&self) -> WriterStats {
        self.shared.state.counters.snapshot()
    }
}

impl std::fmt::Debug for IngestionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionQueue")
            .field("capacity", &self.shared.capacity)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Undoes the pending increment if a send is abandoned.
struct PendingGuard<'a>(Option<&'a AtomicUsize>);

impl PendingGuard<'_> {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(pending) = self.0 {
            pending.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Drain commands in FIFO order until every sender is gone.
fn writer_loop(store: &dyn RegistryStore, mut rx: mpsc::Receiver<WriteCommand>, state: &WriterState) {
    let counters = &state.counters;
    while let Some(command) = rx.blocking_recv() {
        state.pending.fetch_sub(1, Ordering::AcqRel);
        match command {
            WriteCommand::Insert(entry) => match store.insert_if_absent(&entry) {
                Ok(true) => {
                    counters.inserted.fetch_add(1, Ordering::Relaxed);
                    debug!(identifier = %entry.identifier(), extension = %entry.extension(), "entry inserted");
                }
                Ok(false) => {
                    counters.duplicates.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(identifier = %entry.identifier(), error = %e, "failed to insert entry");
                }
            },
            WriteCommand::Remove { entry, ack } => {
                let result = store.remove(&entry);
                match &result {
                    Ok(true) => {
                        counters.removed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!(identifier = %entry.identifier(), error = %e, "failed to remove entry");
                    }
                }
                // The requester may have given up waiting.
                let _ = ack.send(result);
            }
            WriteCommand::Flush { ack } => {
                let _ = ack.send(());
            }
        }
    }
    debug!("writer thread exiting");
}

#[cfg(test)]
mod tests {
    use std::sync::{Condvar, Mutex as StdMutex};
    use std::time::Duration;

    use catscan_store::{InMemoryRegistryStore, StoreError};
    use catscan_types::{Extension, Identifier};

    use super::*;

    fn entry(id: &str, ext: &str) -> Entry {
        Entry::new(id, ext).unwrap()
    }

    /// Records the order of inserts and can hold the writer at a gate.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryRegistryStore,
        order: StdMutex<Vec<String>>,
        gate: StdMutex<bool>,
        opened: Condvar,
        closed_gate: bool,
        fail_on: Option<String>,
    }

    impl RecordingStore {
        fn gated() -> Self {
            Self {
                closed_gate: true,
                ..Default::default()
            }
        }

        fn failing_on(id: &str) -> Self {
            Self {
                fail_on: Some(id.to_string()),
                ..Default::default()
            }
        }

        fn open_gate(&self) {
            *self.gate.lock().unwrap() = true;
            self.opened.notify_all();
        }

        fn order(&self) -> Vec<String> {
            self.order.lock().unwrap().clone()
        }
    }

    impl RegistryStore for RecordingStore {
        fn insert_if_absent(&self, entry: &Entry) -> StoreResult<bool> {
            if self.closed_gate {
                let mut open = self.gate.lock().unwrap();
                while !*open {
                    open = self.opened.wait(open).unwrap();
                }
            }
            if self.fail_on.as_deref() == Some(entry.identifier().as_str()) {
                return Err(StoreError::WriteFailed("disk on fire".into()));
            }
            self.order.lock().unwrap().push(entry.identifier().to_string());
            self.inner.insert_if_absent(entry)
        }

        fn count(&self) -> StoreResult<u64> {
            self.inner.count()
        }

        fn sample_random(&self, n: usize, ext: Option<&Extension>) -> StoreResult<Vec<Entry>> {
            self.inner.sample_random(n, ext)
        }

        fn remove(&self, entry: &Entry) -> StoreResult<bool> {
            self.inner.remove(entry)
        }

        fn contains(&self, id: &Identifier) -> StoreResult<bool> {
            self.inner.contains(id)
        }
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn duplicate_ingest_leaves_count_unchanged() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let queue = IngestionQueue::start(store.clone(), QueueConfig::default()).unwrap();

        queue.enqueue(entry("abc123", "png")).await.unwrap();
        queue.flush().await.unwrap();
        let first = store.count().unwrap();

        queue.enqueue(entry("abc123", "png")).await.unwrap();
        queue.flush().await.unwrap();
        assert_eq!(store.count().unwrap(), first);

        let stats = queue.stop().await.unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.duplicates, 1);
    }

    #[tokio::test]
    async fn stop_drains_in_fifo_order() {
        let store = Arc::new(RecordingStore::default());
        let queue = IngestionQueue::start(store.clone(), QueueConfig::default()).unwrap();

        for id in ["aaa", "bbb", "ccc"] {
            queue.enqueue(entry(id, "png")).await.unwrap();
        }
        queue.stop().await.unwrap();

        assert_eq!(store.order(), vec!["aaa", "bbb", "ccc"]);
        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn stop_waits_for_slow_writer() {
        let store = Arc::new(RecordingStore::gated());
        let queue = IngestionQueue::start(store.clone(), QueueConfig::default()).unwrap();
        for id in ["aaa", "bbb", "ccc"] {
            queue.enqueue(entry(id, "png")).await.unwrap();
        }

        let stopping = tokio::spawn({
            let queue = queue.clone();
            async move { queue.stop().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stopping.is_finished());
        assert!(queue.enqueue(entry("ddd", "png")).await.is_err());

        store.open_gate();
        stopping.await.unwrap().unwrap();
        assert_eq!(store.order(), vec!["aaa", "bbb", "ccc"]);
    }

    #[tokio::test]
    async fn full_queue_blocks_producer_until_space() {
        let store = Arc::new(RecordingStore::gated());
        let queue = IngestionQueue::start(store.clone(), QueueConfig::with_capacity(1)).unwrap();

        // The writer takes "aaa" and parks at the gate; "bbb" fills the buffer.
        queue.enqueue(entry("aaa", "png")).await.unwrap();
        queue.enqueue(entry("bbb", "png")).await.unwrap();

        let blocked = tokio::spawn({
            let queue = queue.clone();
            async move { queue.enqueue(entry("ccc", "png")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());
        assert!(queue.pending() >= 2);

        store.open_gate();
        blocked.await.unwrap().unwrap();
        queue.stop().await.unwrap();
        assert_eq!(store.order(), vec!["aaa", "bbb", "ccc"]);
    }

    #[tokio::test]
    async fn write_failure_does_not_stop_writer() {
        let store = Arc::new(RecordingStore::failing_on("bad"));
        let queue = IngestionQueue::start(store.clone(), QueueConfig::default()).unwrap();

        queue.enqueue(entry("good1", "png")).await.unwrap();
        queue.enqueue(entry("bad", "png")).await.unwrap();
        queue.enqueue(entry("good2", "png")).await.unwrap();
        let stats = queue.stop().await.unwrap();

        assert_eq!(store.order(), vec!["good1", "good2"]);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.inserted, 2);
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn remove_is_applied_before_returning() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let queue = IngestionQueue::start(store.clone(), QueueConfig::default()).unwrap();

        queue.enqueue(entry("abc123", "png")).await.unwrap();
        queue.enqueue(entry("def456", "jpg")).await.unwrap();
        assert!(queue.remove(entry("def456", "jpg")).await.unwrap());
        assert_eq!(store.count().unwrap(), 1);

        assert!(!queue.remove(entry("def456", "jpg")).await.unwrap());
        assert_eq!(queue.stop().await.unwrap().removed, 1);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn closed_queue_rejects_work() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let queue = IngestionQueue::start(store, QueueConfig::default()).unwrap();
        queue.stop().await.unwrap();

        assert!(queue.is_closed().await);
        assert!(matches!(queue.enqueue(entry("a", "b")).await, Err(IngestError::Closed)));
        assert!(matches!(queue.remove(entry("a", "b")).await, Err(IngestError::Closed)));
        assert!(matches!(queue.flush().await, Err(IngestError::Closed)));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let queue = IngestionQueue::start(store, QueueConfig::default()).unwrap();
        queue.enqueue(entry("a", "b")).await.unwrap();
        let first = queue.stop().await.unwrap();
        let second = queue.stop().await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let err = IngestionQueue::start(store, QueueConfig::with_capacity(0)).unwrap_err();
        assert!(matches!(err, IngestError::InvalidCapacity));
    }

    #[tokio::test]
    async fn concurrent_producers_lose_nothing() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let queue = IngestionQueue::start(store.clone(), QueueConfig::with_capacity(8)).unwrap();

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    for i in 0..50 {
                        queue.enqueue(entry(&format!("p{p}-{i}"), "png")).await.unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.await.unwrap();
        }
        queue.stop().await.unwrap();
        assert_eq!(store.count().unwrap(), 200);
    }
}
