//! Process-wide memoization
//!
//! A [`MemoCache`] maps a key to a lazily computed value. Concurrent callers
//! asking for the same missing key wait for a single computation; a failed
//! computation is not stored, so the next caller retries.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

type Slot<V> = Arc<OnceCell<Arc<V>>>;

/// Keyed single-flight cache
#[derive(Debug)]
pub struct MemoCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the value for `key`, computing it with `init` when absent
    pub fn get_or_try_init<E, F>(&self, key: K, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        // The map lock is released before computing so other keys stay available
        let slot = {
            let mut slots = self.lock();
            Arc::clone(slots.entry(key).or_insert_with(|| Arc::new(OnceCell::new())))
        };

        slot.get_or_try_init(|| init().map(Arc::new)).map(Arc::clone)
    }

    /// Value for `key` if it has already been computed
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.lock().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Whether a computed value exists for `key`
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Drop the entry for `key`, returning whether one was present
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of computed values
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_value_computed_once() {
        let cache: MemoCache<&str, u32> = MemoCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_init::<(), _>("a", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache: MemoCache<u8, u32> = MemoCache::new();

        let first: Result<Arc<u32>, String> = cache.get_or_try_init(1, || Err("down".to_string()));
        assert!(first.is_err());
        assert!(!cache.contains(&1));

        let second: Result<Arc<u32>, String> = cache.get_or_try_init(1, || Ok(5));
        assert_eq!(*second.unwrap(), 5);
    }

    #[test]
    fn test_invalidate_forces_recomputation() {
        let cache: MemoCache<u8, u32> = MemoCache::new();
        cache.get_or_try_init::<(), _>(1, || Ok(1)).unwrap();
        cache.get_or_try_init::<(), _>(2, || Ok(2)).unwrap();

        assert!(cache.invalidate(&1));
        assert!(!cache.invalidate(&1));
        assert!(cache.contains(&2));

        let value = cache.get_or_try_init::<(), _>(1, || Ok(10)).unwrap();
        assert_eq!(*value, 10);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_callers_share_one_computation() {
        let cache: Arc<MemoCache<u8, usize>> = Arc::new(MemoCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_try_init::<(), _>(0, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(20));
                            Ok(42)
                        })
                        .map(|v| *v)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
