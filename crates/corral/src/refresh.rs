// Copyright (c) The Corral Project Authors.

//! Background early refresh of soft-expired entries.
//!
//! With `refresh_after` configured, a read that observes an entry past its
//! soft expiry (but before its hard TTL) serves the stale value immediately
//! and triggers at most one background fill: a per-process in-flight set
//! suppresses duplicate local spawns, and the fill lease suppresses duplicate
//! fillers across processes. Readers never block on a refresh; only the
//! elected filler pays the computation latency.

use std::{collections::HashSet, hash::Hash};

use parking_lot::Mutex;
use tick::Stopwatch;

use corral_store::{CacheStore, HolderId, LeaseProvider};

use crate::{
    FillConfig,
    coordinator::Coordinator,
    telemetry::{self, FillActivity},
};

/// Tracks keys with an active background refresh in this process.
pub(crate) struct RefreshTracker<K> {
    in_flight: Mutex<HashSet<K>>,
}

impl<K> std::fmt::Debug for RefreshTracker<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTracker").finish_non_exhaustive()
    }
}

impl<K> RefreshTracker<K>
where
    K: Clone + Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Returns `true` if this key was successfully marked as in-flight
    /// (i.e., not already refreshing).
    pub(crate) fn try_start(&self, key: &K) -> bool {
        self.in_flight.lock().insert(key.clone())
    }

    /// Marks the key as no longer in-flight.
    pub(crate) fn finish(&self, key: &K) {
        self.in_flight.lock().remove(key);
    }
}

impl<K, V, S, L> Coordinator<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    /// Triggers a background fill for a soft-expired key.
    ///
    /// If a refresh is already in flight for this key in this process, or no
    /// runtime is available, this returns without spawning.
    pub(crate) fn spawn_refresh<F, Fut, E>(&self, key: &K, config: FillConfig, f: F, stopwatch: &Stopwatch)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        if !self.inner.refresh.try_start(key) {
            return;
        }

        let coordinator = self.clone();
        let task_key = key.clone();
        let spawned = self.inner.runtime.spawn(async move {
            coordinator.refresh_fill(&task_key, &config, f).await;
            coordinator.inner.refresh.finish(&task_key);
        });

        if spawned {
            telemetry::record(self.inner.name, FillActivity::RefreshSpawned, stopwatch.elapsed());
        } else {
            self.inner.refresh.finish(key);
        }
    }

    /// The background half of a refresh: contend for the lease, fill if won.
    ///
    /// A denied lease means another process is already refreshing. A failed
    /// fill leaves the stale entry in place; it stays serveable until hard
    /// expiry and the next soft-expired read tries again.
    async fn refresh_fill<F, Fut, E>(&self, key: &K, config: &FillConfig, f: F)
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let stopwatch = self.inner.clock.stopwatch();
        let holder = HolderId::generate();
        if self.contend(key, &holder, config).await {
            let _ = self.fill(key, &holder, config, &stopwatch, f).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_deduplicates_in_flight_keys() {
        let tracker: RefreshTracker<String> = RefreshTracker::new();
        let key = "key1".to_string();

        assert!(tracker.try_start(&key));
        assert!(!tracker.try_start(&key));

        tracker.finish(&key);
        assert!(tracker.try_start(&key));
    }

    #[test]
    fn tracker_tracks_keys_independently() {
        let tracker: RefreshTracker<String> = RefreshTracker::new();

        assert!(tracker.try_start(&"a".to_string()));
        assert!(tracker.try_start(&"b".to_string()));
        assert!(!tracker.try_start(&"a".to_string()));

        tracker.finish(&"a".to_string());
        assert!(tracker.try_start(&"a".to_string()));
        assert!(!tracker.try_start(&"b".to_string()));
    }

    #[test]
    fn finish_of_unknown_key_is_harmless() {
        let tracker: RefreshTracker<String> = RefreshTracker::new();
        tracker.finish(&"never-started".to_string());
        assert!(tracker.try_start(&"never-started".to_string()));
    }
}
