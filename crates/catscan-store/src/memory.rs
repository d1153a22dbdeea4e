use std::collections::HashMap;
use std::sync::RwLock;

use catscan_types::{Entry, Extension, Identifier};
use rand::seq::{IteratorRandom, SliceRandom};

use crate::error::StoreResult;
use crate::traits::RegistryStore;

/// In-memory, HashMap-based registry store.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock` for
/// safe concurrent access. Nothing survives the process.
pub struct InMemoryRegistryStore {
    entries: RwLock<HashMap<Identifier, Extension>>,
}

impl InMemoryRegistryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Return all entries sorted by identifier.
    pub fn all_entries(&self) -> Vec<Entry> {
        let map = self.entries.read().expect("lock poisoned");
        let mut entries: Vec<Entry> = map
            .iter()
            .map(|(id, ext)| Entry::from_parts(id.clone(), ext.clone()))
            .collect();
        entries.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        entries
    }
}

impl Default for InMemoryRegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStore for InMemoryRegistryStore {
    fn insert_if_absent(&self, entry: &Entry) -> StoreResult<bool> {
        let mut map = self.entries.write().expect("lock poisoned");
        if map.contains_key(entry.identifier()) {
            return Ok(false);
        }
        map.insert(entry.identifier().clone(), entry.extension().clone());
        Ok(true)
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }

    fn sample_random(&self, n: usize, extension: Option<&Extension>) -> StoreResult<Vec<Entry>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let map = self.entries.read().expect("lock poisoned");
        let mut rng = rand::thread_rng();
        let mut picked: Vec<Entry> = map
            .iter()
            .filter(|(_, ext)| extension.map_or(true, |want| *ext == want))
            .map(|(id, ext)| Entry::from_parts(id.clone(), ext.clone()))
            .choose_multiple(&mut rng, n);
        // Reservoir sampling keeps a partial insertion order.
        picked.shuffle(&mut rng);
        Ok(picked)
    }

    fn remove(&self, entry: &Entry) -> StoreResult<bool> {
        let mut map = self.entries.write().expect("lock poisoned");
        match map.get(entry.identifier()) {
            Some(ext) if ext == entry.extension() => {
                map.remove(entry.identifier());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn contains(&self, identifier: &Identifier) -> StoreResult<bool> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.contains_key(identifier))
    }
}

impl std::fmt::Debug for InMemoryRegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryRegistryStore")
            .field("entry_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, ext: &str) -> Entry {
        Entry::new(id, ext).unwrap()
    }

    fn ext(s: &str) -> Extension {
        Extension::new(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // Insert / dedup
    // -----------------------------------------------------------------------

    #[test]
    fn insert_and_count() {
        let store = InMemoryRegistryStore::new();
        assert!(store.insert_if_absent(&entry("abc123", "png")).unwrap());
        assert!(store.insert_if_absent(&entry("def456", "jpg")).unwrap());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn insert_is_idempotent() {
        let store = InMemoryRegistryStore::new();
        let e = entry("abc123", "png");
        assert!(store.insert_if_absent(&e).unwrap());
        assert!(!store.insert_if_absent(&e).unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn uniqueness_is_on_identifier_alone() {
        let store = InMemoryRegistryStore::new();
        store.insert_if_absent(&entry("abc123", "png")).unwrap();
        assert!(!store.insert_if_absent(&entry("abc123", "gif")).unwrap());
        assert_eq!(store.all_entries(), vec![entry("abc123", "png")]);
    }

    // -----------------------------------------------------------------------
    // Remove
    // -----------------------------------------------------------------------

    #[test]
    fn remove_present_entry() {
        let store = InMemoryRegistryStore::new();
        let e = entry("abc123", "png");
        store.insert_if_absent(&e).unwrap();
        assert!(store.remove(&e).unwrap());
        assert!(!store.contains(e.identifier()).unwrap());
        assert!(!store.remove(&e).unwrap());
    }

    #[test]
    fn remove_requires_matching_extension() {
        let store = InMemoryRegistryStore::new();
        store.insert_if_absent(&entry("abc123", "png")).unwrap();
        assert!(!store.remove(&entry("abc123", "jpg")).unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Sampling
    // -----------------------------------------------------------------------

    #[test]
    fn sample_is_bounded_by_n_and_size() {
        let store = InMemoryRegistryStore::new();
        for i in 0..5 {
            store.insert_if_absent(&entry(&format!("id{i:04}"), "png")).unwrap();
        }
        assert_eq!(store.sample_random(3, None).unwrap().len(), 3);
        assert_eq!(store.sample_random(10, None).unwrap().len(), 5);
        assert!(store.sample_random(0, None).unwrap().is_empty());
    }

    #[test]
    fn sample_on_empty_store_is_empty() {
        let store = InMemoryRegistryStore::new();
        assert!(store.sample_random(10, None).unwrap().is_empty());
    }

    #[test]
    fn sample_returns_distinct_entries() {
        let store = InMemoryRegistryStore::new();
        for i in 0..20 {
            store.insert_if_absent(&entry(&format!("id{i:04}"), "png")).unwrap();
        }
        let mut sample = store.sample_random(20, None).unwrap();
        sample.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        sample.dedup();
        assert_eq!(sample.len(), 20);
    }

    #[test]
    fn sample_honours_extension_filter() {
        let store = InMemoryRegistryStore::new();
        store.insert_if_absent(&entry("aaa111", "png")).unwrap();
        store.insert_if_absent(&entry("bbb222", "jpg")).unwrap();
        store.insert_if_absent(&entry("ccc333", "png")).unwrap();

        let sample = store.sample_random(10, Some(&ext("png"))).unwrap();
        assert_eq!(sample.len(), 2);
        assert!(sample.iter().all(|e| e.extension().as_str() == "png"));

        assert!(store.sample_random(10, Some(&ext("gif"))).unwrap().is_empty());
    }

    #[test]
    fn sample_reaches_every_entry() {
        let store = InMemoryRegistryStore::new();
        for i in 0..8 {
            store.insert_if_absent(&entry(&format!("id{i:04}"), "png")).unwrap();
        }
        let mut seen = std::collections::HashSet::new();
        for _ in 0..400 {
            for e in store.sample_random(1, None).unwrap() {
                seen.insert(e.identifier().clone());
            }
        }
        assert_eq!(seen.len(), 8);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryRegistryStore::new());
        for i in 0..16 {
            store.insert_if_absent(&entry(&format!("id{i:04}"), "png")).unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    assert_eq!(store.count().unwrap(), 16);
                    assert_eq!(store.sample_random(4, None).unwrap().len(), 4);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryRegistryStore::default();
        store.insert_if_absent(&entry("x", "y")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryRegistryStore"));
        assert!(debug.contains("entry_count"));
    }
}
