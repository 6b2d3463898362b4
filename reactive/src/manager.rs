//! Keyed registry of debouncers with idle eviction.
//!
//! The manager exclusively owns all [`Debouncer`] instances it creates.
//! Entries that have not been accessed for the configured idle period are
//! evicted by [`cleanup`](DebouncerManager::cleanup); eviction removes the
//! entry from the map first and only then shuts the debouncer down, so a
//! concurrent `get_or_create` for the same key builds a fresh instance and
//! can never resurrect the evicted one.

use crate::debouncer::{Debouncer, TaskRunner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Entry {
    debouncer: Arc<Debouncer>,
    last_access: Instant,
}

/// Creates and owns one [`Debouncer`] per key.
pub struct DebouncerManager {
    entries: Mutex<HashMap<String, Entry>>,
    idle_ttl: Duration,
    runner: Arc<dyn TaskRunner>,
}

impl DebouncerManager {
    pub fn new(idle_ttl: Duration, runner: Arc<dyn TaskRunner>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_ttl,
            runner,
        }
    }

    /// Return the live debouncer for `key`, or atomically create one.
    ///
    /// Concurrent calls for the same key observe a single live instance.
    /// Accessing an entry refreshes its idle clock.
    pub fn get_or_create(
        &self,
        key: &str,
        action: Arc<dyn Fn() + Send + Sync>,
        delay: Duration,
    ) -> Arc<Debouncer> {
        let mut entries = self.entries.lock().expect("debouncer manager lock poisoned");
        match entries.entry(key.to_string()) {
            std::collections::hash_map::Entry::Occupied(mut occupied) => {
                occupied.get_mut().last_access = Instant::now();
                Arc::clone(&occupied.get().debouncer)
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                let debouncer = Arc::new(Debouncer::new(action, delay, Arc::clone(&self.runner)));
                vacant.insert(Entry {
                    debouncer: Arc::clone(&debouncer),
                    last_access: Instant::now(),
                });
                debouncer
            }
        }
    }

    /// Evict entries idle longer than the TTL and shut each one down.
    ///
    /// Shutdown happens after the entry has left the map, outside the lock.
    pub async fn cleanup(&self) {
        let evicted: Vec<(String, Arc<Debouncer>)> = {
            let mut entries = self.entries.lock().expect("debouncer manager lock poisoned");
            let now = Instant::now();
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_access) >= self.idle_ttl)
                .map(|(key, _)| key.clone())
                .collect();
            expired
                .into_iter()
                .filter_map(|key| {
                    entries
                        .remove(&key)
                        .map(|entry| (key, entry.debouncer))
                })
                .collect()
        };

        for (key, debouncer) in evicted {
            debouncer.shutdown().await;
            tracing::debug!(key, "evicted idle debouncer");
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("debouncer manager lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debouncer::PassthroughRunner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager(idle_ttl: Duration) -> Arc<DebouncerManager> {
        Arc::new(DebouncerManager::new(idle_ttl, Arc::new(PassthroughRunner)))
    }

    fn noop() -> Arc<dyn Fn() + Send + Sync> {
        Arc::new(|| {})
    }

    #[tokio::test]
    async fn same_key_returns_same_instance() {
        let manager = manager(Duration::from_secs(60));
        let first = manager.get_or_create("batch-1", noop(), Duration::from_millis(50));
        let second = manager.get_or_create("batch-1", noop(), Duration::from_millis(50));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_get_distinct_instances() {
        let manager = manager(Duration::from_secs(60));
        let a = manager.get_or_create("batch-1", noop(), Duration::from_millis(50));
        let b = manager.get_or_create("batch-2", noop(), Duration::from_millis(50));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_get_or_create_yields_one_instance() {
        let manager = manager(Duration::from_secs(60));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager.get_or_create("shared", noop(), Duration::from_millis(50))
            }));
        }

        let mut instances = Vec::new();
        for handle in handles {
            instances.push(handle.await.expect("task panicked"));
        }

        let first = &instances[0];
        assert!(instances.iter().all(|d| Arc::ptr_eq(first, d)));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn cleanup_evicts_and_shuts_down_idle_entries() {
        let manager = manager(Duration::from_millis(50));
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_in = Arc::clone(&counter);
        let debouncer = manager.get_or_create(
            "idle",
            Arc::new(move || {
                counter_in.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.cleanup().await;

        assert_eq!(manager.len(), 0);
        assert!(debouncer.is_closed());

        // A shut-down debouncer no longer schedules anything.
        debouncer.call();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cleanup_keeps_fresh_entries() {
        let manager = manager(Duration::from_secs(60));
        manager.get_or_create("fresh", noop(), Duration::from_millis(10));
        manager.cleanup().await;
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn access_refreshes_idle_clock() {
        let manager = manager(Duration::from_millis(80));
        manager.get_or_create("busy", noop(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.get_or_create("busy", noop(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // 100ms since creation but only 50ms since last access.
        manager.cleanup().await;
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn eviction_does_not_block_new_entry_for_same_key() {
        let manager = manager(Duration::from_millis(30));
        let old = manager.get_or_create("key", noop(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(60)).await;
        manager.cleanup().await;

        let fresh = manager.get_or_create("key", noop(), Duration::from_millis(10));
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(old.is_closed());
        assert!(!fresh.is_closed());
    }
}
