use std::sync::{Mutex, MutexGuard};

/// Striped lock table serializing read-modify-write cycles per owner key.
///
/// Each key hashes to one of a fixed number of stripes. An operation locks
/// the stripes of every key it touches in ascending stripe order, so two
/// operations over the same pair of keys (in either argument order) can
/// never deadlock. Unrelated keys may share a stripe; that only costs
/// parallelism.
pub struct KeyLocks {
    stripes: Vec<Mutex<()>>,
}

/// Guards held for the duration of one operation.
pub struct KeyGuard<'a> {
    _guards: Vec<MutexGuard<'a, ()>>,
}

impl KeyLocks {
    /// Create a table with `stripes` locks (at least one).
    pub fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Number of stripes in the table.
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Stripe index for a key.
    pub fn stripe_of(&self, key: &str) -> usize {
        let hash = blake3::hash(key.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.stripes.len() as u64) as usize
    }

    /// Lock every stripe covering `keys`, in ascending stripe order.
    pub fn lock(&self, keys: &[&str]) -> KeyGuard<'_> {
        let mut indices: Vec<usize> = keys.iter().map(|key| self.stripe_of(key)).collect();
        indices.sort_unstable();
        indices.dedup();

        // Stripes guard no data, so a poisoned stripe is still usable.
        let guards = indices
            .into_iter()
            .map(|i| {
                self.stripes[i]
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
            })
            .collect();

        KeyGuard { _guards: guards }
    }
}

impl std::fmt::Debug for KeyLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLocks")
            .field("stripes", &self.stripes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn stripe_is_stable_and_in_range() {
        let locks = KeyLocks::new(16);
        for key in ["A", "B", "Ezequiel", "Salomão", ""] {
            let stripe = locks.stripe_of(key);
            assert!(stripe < 16);
            assert_eq!(stripe, locks.stripe_of(key));
        }
    }

    #[test]
    fn zero_stripes_is_clamped() {
        let locks = KeyLocks::new(0);
        assert_eq!(locks.stripe_count(), 1);
        let _guard = locks.lock(&["A", "B"]);
    }

    #[test]
    fn same_key_twice_does_not_self_deadlock() {
        let locks = KeyLocks::new(4);
        let _guard = locks.lock(&["A", "A"]);
    }

    #[test]
    fn crossing_lock_orders_do_not_deadlock() {
        let locks = Arc::new(KeyLocks::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = Arc::clone(&locks);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let keys = if i % 2 == 0 { ["A", "B"] } else { ["B", "A"] };
                        let _guard = locks.lock(&keys);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }
}
