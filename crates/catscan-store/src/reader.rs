use std::sync::Arc;

use catscan_types::{Entry, Extension, Identifier};

use crate::error::{StoreError, StoreResult};
use crate::traits::RegistryStore;

/// Async read handle over a [`RegistryStore`].
///
/// Store calls are blocking, so each read runs on tokio's blocking pool.
/// The handle deliberately exposes no write operations: writes belong to the
/// ingestion queue's single writer.
#[derive(Clone)]
pub struct RegistryReader {
    store: Arc<dyn RegistryStore>,
}

impl RegistryReader {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    /// Total number of entries.
    pub async fn count(&self) -> StoreResult<u64> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.count()).await
    }

    /// Up to `n` random entries, optionally restricted to `extension`.
    pub async fn sample(&self, n: usize, extension: Option<Extension>) -> StoreResult<Vec<Entry>> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.sample_random(n, extension.as_ref())).await
    }

    pub async fn contains(&self, identifier: Identifier) -> StoreResult<bool> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.contains(&identifier)).await
    }
}

impl std::fmt::Debug for RegistryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryReader").finish_non_exhaustive()
    }
}

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::ReadFailed(format!("read task failed: {e}")))?
}
