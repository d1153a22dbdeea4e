use catscan_types::{Entry, Extension, Identifier};

use crate::error::StoreResult;

/// Durable registry of entries.
///
/// All implementations must satisfy these invariants:
/// - At most one row per identifier, enforced by the backend itself.
/// - `insert_if_absent` for a present identifier leaves the registry unchanged
///   and succeeds.
/// - `remove` for an absent entry succeeds.
/// - Reads may run concurrently with the writer and with each other.
pub trait RegistryStore: Send + Sync {
    /// Insert `entry` unless its identifier is already present.
    ///
    /// Returns `true` if a row was added. Fails only on storage faults,
    /// never on duplicates.
    fn insert_if_absent(&self, entry: &Entry) -> StoreResult<bool>;

    /// Total number of entries.
    fn count(&self) -> StoreResult<u64>;

    /// Up to `n` entries chosen at random, optionally restricted to one
    /// extension.
    ///
    /// Returns fewer than `n` (possibly none) when the registry or the
    /// filtered subset is smaller than `n`.
    fn sample_random(&self, n: usize, extension: Option<&Extension>) -> StoreResult<Vec<Entry>>;

    /// Delete the row matching both identifier and extension, if present.
    ///
    /// Returns `true` if a row was deleted.
    fn remove(&self, entry: &Entry) -> StoreResult<bool>;

    /// Check whether an identifier is present.
    fn contains(&self, identifier: &Identifier) -> StoreResult<bool>;
}
