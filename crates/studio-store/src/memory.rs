use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;

use crate::batch::{KeyRange, WriteBatch};
use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// In-memory, `BTreeMap`-based key-value store.
///
/// Intended for tests and embedding. Entries live behind a `RwLock`; a batch
/// is applied under a single write guard, which makes it atomic with respect
/// to every reader. Values are cloned on read and write.
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    ///
    /// Counts through a poisoned lock; the store methods report poisoning
    /// as [`StoreError::Unavailable`].
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries.
    pub fn clear(&self) -> StoreResult<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let puts = batch.len();
        let mut map = self.entries.write().map_err(poisoned)?;
        batch.apply_to(&mut map);
        debug!(puts, "in-memory batch applied");
        Ok(())
    }

    fn scan(&self, range: &KeyRange) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(range.collect_from(&map))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(puts: &[(&str, &str)]) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for (k, v) in puts {
            batch.put(*k, v.as_bytes());
        }
        batch
    }

    // -----------------------------------------------------------------------
    // Point operations
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let store = InMemoryKvStore::new();
        store.put("owner-a", b"{}").unwrap();
        assert_eq!(store.get("owner-a").unwrap().as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryKvStore::new();
        assert!(store.get("missing").unwrap().is_none());
        assert!(!store.contains("missing").unwrap());
    }

    #[test]
    fn put_overwrites() {
        let store = InMemoryKvStore::new();
        store.put("k", b"one").unwrap();
        store.put("k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"two");
        assert_eq!(store.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[test]
    fn batch_writes_every_key() {
        let store = InMemoryKvStore::new();
        store.write(batch(&[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap().unwrap(), b"1");
        assert_eq!(store.get("b").unwrap().unwrap(), b"2");
    }

    #[test]
    fn empty_batch_is_noop() {
        let store = InMemoryKvStore::new();
        store.write(WriteBatch::new()).unwrap();
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Scans
    // -----------------------------------------------------------------------

    #[test]
    fn scan_all_is_ordered() {
        let store = InMemoryKvStore::new();
        store
            .write(batch(&[("zeta", "z"), ("alpha", "a"), ("mid", "m")]))
            .unwrap();
        let keys: Vec<_> = store.scan_all().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn scan_empty_store() {
        let store = InMemoryKvStore::new();
        assert!(store.scan_all().unwrap().is_empty());
    }

    #[test]
    fn scan_prefix_filters() {
        let store = InMemoryKvStore::new();
        store
            .write(batch(&[("owner/a", "1"), ("owner/b", "2"), ("other", "3")]))
            .unwrap();
        assert_eq!(store.scan_prefix("owner/").unwrap().len(), 2);
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn clear_removes_all() {
        let store = InMemoryKvStore::new();
        store.write(batch(&[("a", "1"), ("b", "2")])).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn arc_store_delegates() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryKvStore::new());
        let shared: Arc<dyn KeyValueStore> = store.clone();
        shared.put("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"v");
    }

    #[test]
    fn concurrent_batches_are_never_torn() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryKvStore::new());
        store.write(batch(&[("left", "0"), ("right", "0")])).unwrap();

        let writers: Vec<_> = (1..=8)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let value = n.to_string();
                    store
                        .write(batch(&[("left", value.as_str()), ("right", value.as_str())]))
                        .unwrap();
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    let entries = store.scan_all().unwrap();
                    assert_eq!(entries[0].1, entries[1].1, "observed half a batch");
                }
            })
        };

        for h in writers {
            h.join().expect("writer should not panic");
        }
        reader.join().expect("reader should not panic");
    }

    #[test]
    fn poisoned_lock_is_unavailable_but_still_counted() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryKvStore::new());
        store.write(batch(&[("a", "1"), ("b", "2")])).unwrap();

        let holder = Arc::clone(&store);
        let result = thread::spawn(move || {
            let _guard = holder.entries.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
        assert!(matches!(store.get("a"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.put("c", b"3"), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn debug_format() {
        let store = InMemoryKvStore::new();
        store.put("x", b"1").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryKvStore"));
        assert!(debug.contains("key_count"));
    }
}
