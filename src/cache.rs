// Time-boxed memoization of pure computations.
//
// Each key owns a slot guarded by its own mutex. Callers asking for the same
// key while a value is being computed wait on that slot and then read the
// fresh value, so a key is computed at most once per TTL window. Different
// keys never block each other beyond the short map lookup. Expired slots
// are purged whenever a new slot is handed out.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry<V> {
    value: Arc<V>,
    stored_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic inside a computation leaves no partial entry behind, so a
    // poisoned lock is still consistent.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = lock(&self.slots);
        self.purge_expired(&mut slots);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Drop slots whose entry is missing or past the TTL. Slots another
    /// caller holds (waiting or computing) are kept.
    fn purge_expired(&self, slots: &mut HashMap<K, Slot<V>>) {
        let ttl = self.ttl;
        let fresh = |entry: &Option<Entry<V>>| {
            entry.as_ref().is_some_and(|e| e.stored_at.elapsed() < ttl)
        };
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => fresh(&entry),
                Err(TryLockError::Poisoned(p)) => fresh(&p.into_inner()),
                Err(TryLockError::WouldBlock) => true,
            }
        });
    }

    /// Cached value for `key`, or the result of `compute` when the entry is
    /// missing or older than the TTL. Errors are returned to the caller and
    /// not cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: &K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);
        let mut entry = lock(&slot);
        if let Some(e) = entry.as_ref() {
            if e.stored_at.elapsed() < self.ttl {
                debug!(?key, "cache hit");
                return Ok(Arc::clone(&e.value));
            }
            debug!(?key, "cache entry expired");
        } else {
            debug!(?key, "cache miss");
        }
        *entry = None;
        let value = Arc::new(compute()?);
        *entry = Some(Entry {
            value: Arc::clone(&value),
            stored_at: Instant::now(),
        });
        Ok(value)
    }

    /// Fresh cached value without computing anything.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = lock(&self.slots).get(key).cloned()?;
        let entry = lock(&slot);
        entry
            .as_ref()
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.value))
    }

    /// Keep only the keys for which `keep` returns true.
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        lock(&self.slots).retain(|k, _| keep(k));
    }

    pub fn invalidate(&self, key: &K) {
        lock(&self.slots).remove(key);
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Number of keys with a slot. Stale slots linger only until the next
    /// insertion purges them.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
