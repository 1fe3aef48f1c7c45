use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;

/// A set of in-flight enforcement keys. The game server fires several
/// logically-equivalent events for one transition within milliseconds;
/// whichever handler acquires the key first runs, the rest bail out.
///
/// `try_acquire` is a single guarded check-then-insert, so two
/// interleaved callers can never both see the key as absent.
#[derive(Clone, Debug, Default)]
pub struct LockRegistry {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits the key if absent. Returns false when it is already held,
    /// in which case the caller must not proceed.
    pub fn try_acquire(&self, key: &str) -> bool {
        let mut keys = self.keys.lock().expect("lock registry poisoned");
        keys.insert(key.to_string())
    }

    /// Removes the key. Returns false if it was not held.
    pub fn release(&self, key: &str) -> bool {
        let mut keys = self.keys.lock().expect("lock registry poisoned");
        keys.remove(key)
    }

    /// Keeps the key held for a little longer before releasing, so a
    /// duplicate trigger arriving just after the first pass finished is
    /// still absorbed.
    pub async fn release_after(&self, key: &str, delay: Duration) {
        sleep(delay).await;
        self.release(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        let keys = self.keys.lock().expect("lock registry poisoned");
        keys.contains(key)
    }

    /// Clears every key. Shutdown/reset only.
    pub fn release_all(&self) {
        let mut keys = self.keys.lock().expect("lock registry poisoned");
        keys.clear();
    }
}
