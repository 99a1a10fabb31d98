use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

/// One mutex per key, created on demand.
///
/// Used for the single-writer rule on cluster statistics and for keeping a
/// document to one in-flight assignment decision. Entries nobody holds are
/// dropped on the next acquisition so the map tracks live contention only.
pub(crate) struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

/// Held lock for one key. Released on drop.
pub(crate) type KeyGuard = ArcMutexGuard<RawMutex, ()>;

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks until the lock for `key` is held.
    pub(crate) fn lock(&self, key: &K) -> KeyGuard {
        let slot = {
            let mut slots = self.slots.lock();
            // Only the map holds idle slots.
            slots.retain(|_, m| Arc::strong_count(m) > 1);
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_arc()
    }

    /// Locks two keys in a fixed order so opposing callers cannot deadlock.
    /// `a` and `b` must differ.
    pub(crate) fn lock_pair(&self, a: &K, b: &K) -> (KeyGuard, KeyGuard)
    where
        K: Ord,
    {
        debug_assert!(a != b, "lock_pair on identical keys");
        if a < b {
            let ga = self.lock(a);
            let gb = self.lock(b);
            (ga, gb)
        } else {
            let gb = self.lock(b);
            let ga = self.lock(a);
            (ga, gb)
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().len()
    }
}
