use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async mutexes, evicted after sitting idle.
///
/// The cache has no size bound: a bounded cache may refuse to admit a new
/// key, which would hand concurrent callers different mutexes for it.
/// A critical section must stay far shorter than the idle window, otherwise
/// the entry can expire under a holder and a later caller gets a fresh mutex.
#[derive(Clone)]
pub struct KeyedLock {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl KeyedLock {
    pub fn new(idle: Duration) -> Self {
        Self {
            locks: Cache::builder().time_to_idle(idle).build(),
        }
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .get_with(key.to_string(), async { Arc::new(Mutex::new(())) })
            .await;
        mutex.lock_owned().await
    }
}

impl Default for KeyedLock {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}
