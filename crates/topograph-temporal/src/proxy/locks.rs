//! Per-proxy exclusive sections.
//!
//! Mutation and TTL close of one proxy serialize on its lock; different
//! proxies proceed in parallel. There is no engine-wide lock.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

#[derive(Default)]
pub struct ProxyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ProxyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `proxy_id`.
    pub fn with_lock<T, F>(&self, proxy_id: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        // Clone the Arc out so the shard guard is released before blocking.
        let lock = self
            .locks
            .entry(proxy_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        // The mutex guards no data.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of proxies that have ever been locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
