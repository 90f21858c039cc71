use std::sync::Arc;

use crate::batch::{KeyRange, WriteBatch};
use crate::error::StoreResult;

/// Ordered key-value store consumed by the ledger engine.
///
/// All implementations must satisfy these invariants:
/// - `write` applies a batch all-or-nothing. A reader never observes half of
///   a batch, and a failed `write` leaves every key untouched.
/// - A successful write is visible to every subsequent `get` and `scan`
///   (read-after-write per key).
/// - The store never interprets values.
/// - All backend failures are returned as errors, never swallowed.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Atomically apply every put in `batch`.
    fn write(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Return every entry whose key falls inside `range`.
    ///
    /// The bundled backends return entries in ascending key order; other
    /// backends only promise a complete, duplicate-free sequence.
    fn scan(&self, range: &KeyRange) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Store `value` under `key`.
    ///
    /// Default implementation writes a single-entry batch.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(batch)
    }

    /// Check whether a key exists.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Return every entry whose key starts with `prefix`.
    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        self.scan(&KeyRange::prefix(prefix))
    }

    /// Return every entry in the store.
    fn scan_all(&self) -> StoreResult<Vec<(String, Vec<u8>)>> {
        self.scan(&KeyRange::All)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        (**self).write(batch)
    }

    fn scan(&self, range: &KeyRange) -> StoreResult<Vec<(String, Vec<u8>)>> {
        (**self).scan(range)
    }
}
