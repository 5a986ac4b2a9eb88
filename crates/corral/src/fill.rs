// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! The filler role: compute under a lease, publish, release.

use std::{hash::Hash, pin::pin, sync::Arc};

use futures::{
    StreamExt,
    future::{Either, select},
};
use tick::{PeriodicTimer, Stopwatch};

use corral_store::{CacheEntry, CacheStore, HolderId, LeaseProvider};

use crate::{
    FillConfig, FillError, FillErrorKind,
    coordinator::{Coordinator, Inner},
    telemetry::{self, FillActivity},
};

impl<K, V, S, L> Coordinator<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    /// Runs the filler role for a caller that holds the lease.
    ///
    /// The computation is a single attempt: it is never retried here, and a
    /// failure releases the lease immediately (letting it expire would turn
    /// the lease TTL into a hidden retry delay for everyone else) and leaves
    /// the cache untouched.
    pub(crate) async fn fill<F, Fut, E>(
        &self,
        key: &K,
        holder: &HolderId,
        config: &FillConfig,
        stopwatch: &Stopwatch,
        f: F,
    ) -> Result<CacheEntry<V>, FillError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let guard = LeaseGuard::new(self, key.clone(), holder.clone());

        // Commit race window: another filler may have published between this
        // caller's probe and its acquire. Adopt rather than recompute.
        if let Some(entry) = self.adopt_recent_commit(key, config).await {
            guard.release().await;
            telemetry::record(self.inner.name, FillActivity::Coalesced, stopwatch.elapsed());
            return Ok(entry);
        }

        match self.compute_with_renew(key, holder, config, stopwatch, f()).await {
            Ok(value) => {
                let entry = self.publish(key, value, config, stopwatch).await;
                guard.release().await;
                telemetry::record(self.inner.name, FillActivity::Filled, stopwatch.elapsed());
                Ok(entry)
            }
            Err(error) => {
                guard.release().await;
                telemetry::record(self.inner.name, FillActivity::FillFailed, stopwatch.elapsed());
                Err(FillError::caused_by(FillErrorKind::ComputationFailed, error))
            }
        }
    }

    /// Checks the result slot, then the canonical entry, for a value
    /// committed by a concurrent filler. Soft-expired values are not adopted:
    /// a refresh fill must recompute, not re-serve what it set out to
    /// replace.
    async fn adopt_recent_commit(&self, key: &K, config: &FillConfig) -> Option<CacheEntry<V>> {
        if let Some(slots) = &self.inner.slots {
            if let Ok(Some(slot_entry)) = slots.get(key).await {
                if !self.is_soft_expired(&slot_entry, config) {
                    return Some(self.promote(key, slot_entry, config).await);
                }
            }
        }

        match self.probe(key).await {
            Some(entry) if !self.is_soft_expired(&entry, config) => Some(entry),
            _ => None,
        }
    }

    /// Drives the computation while renewing the lease at half the lease TTL,
    /// so a healthy filler stays exclusive past the initial TTL.
    ///
    /// A lost renewal does not abort the computation: the value is still
    /// wanted, and a duplicate computation is the safe failure direction.
    async fn compute_with_renew<Fut>(
        &self,
        key: &K,
        holder: &HolderId,
        config: &FillConfig,
        stopwatch: &Stopwatch,
        fut: Fut,
    ) -> Fut::Output
    where
        Fut: Future + Send,
    {
        // PeriodicTimer clamps degenerate periods to its minimum resolution.
        let mut timer = PeriodicTimer::new(&self.inner.clock, config.fill_ttl / 2);
        let mut fut = pin!(fut);

        loop {
            match select(fut.as_mut(), timer.next()).await {
                Either::Left((output, _)) => return output,
                Either::Right(_) => {
                    let renewed = self
                        .inner
                        .leases
                        .renew(key, holder, config.fill_ttl)
                        .await
                        .unwrap_or(false);
                    if !renewed {
                        telemetry::record(self.inner.name, FillActivity::LeaseLost, stopwatch.elapsed());
                    }
                }
            }
        }
    }

    /// Publishes a computed value: result slot first (the hand-off waiters
    /// poll), then the canonical entry.
    ///
    /// A failed write is logged and skipped; the caller still gets the value
    /// it paid for, and the next miss episode recomputes.
    async fn publish(&self, key: &K, value: V, config: &FillConfig, stopwatch: &Stopwatch) -> CacheEntry<V> {
        let now = self.inner.clock.system_time();

        let mut entry = CacheEntry::with_ttl(value, config.entry_ttl);
        entry.set_cached_at(now);

        if let Some(slots) = &self.inner.slots {
            let mut slot_entry = CacheEntry::with_ttl(entry.value().clone(), config.effective_slot_ttl());
            slot_entry.set_cached_at(now);
            if slots.insert(key, slot_entry).await.is_err() {
                telemetry::record(self.inner.name, FillActivity::CommitSkipped, stopwatch.elapsed());
            }
        }

        if self.inner.store.insert(key, entry.clone()).await.is_err() {
            telemetry::record(self.inner.name, FillActivity::CommitSkipped, stopwatch.elapsed());
        }

        entry
    }

    /// Writes a value observed in the result slot through to the canonical
    /// entry, preserving the compute timestamp so soft expiry ages correctly.
    ///
    /// The canonical insert is an idempotent upsert, so racing the filler's
    /// own commit is harmless.
    pub(crate) async fn promote(&self, key: &K, slot_entry: CacheEntry<V>, config: &FillConfig) -> CacheEntry<V> {
        let mut entry = CacheEntry::with_ttl(slot_entry.value().clone(), config.entry_ttl);
        if let Some(cached_at) = slot_entry.cached_at() {
            entry.set_cached_at(cached_at);
        }
        let _ = self.inner.store.insert(key, entry.clone()).await;
        entry
    }
}

/// Releases the lease when a fill is cancelled mid-flight, so waiters are not
/// stranded until the lease TTL expires.
///
/// On the normal paths the lease is released explicitly via
/// [`release`](Self::release), which disarms the guard.
pub(crate) struct LeaseGuard<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    inner: Option<Arc<Inner<K, V, S, L>>>,
    key: K,
    holder: HolderId,
}

impl<K, V, S, L> LeaseGuard<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    fn new(coordinator: &Coordinator<K, V, S, L>, key: K, holder: HolderId) -> Self {
        Self {
            inner: Some(Arc::clone(&coordinator.inner)),
            key,
            holder,
        }
    }

    /// Releases the lease now and disarms the drop handler.
    ///
    /// Best-effort: a failed release is ignored, the lease expires on its
    /// own.
    async fn release(mut self) {
        if let Some(inner) = self.inner.take() {
            let _ = inner.leases.release(&self.key, &self.holder).await;
        }
    }
}

impl<K, V, S, L> Drop for LeaseGuard<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else { return };

        #[cfg(feature = "tokio")]
        {
            let key = self.key.clone();
            let holder = self.holder.clone();
            let release_via = Arc::clone(&inner);
            // Fire-and-forget; if no runtime is available the lease
            // self-expires after fill_ttl.
            let _ = inner.runtime.spawn(async move {
                let _ = release_via.leases.release(&key, &holder).await;
            });
        }

        #[cfg(not(feature = "tokio"))]
        drop(inner);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use corral_store::testing::{MockLeases, MockStore};
    use tick::Clock;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn coordinator() -> Coordinator<String, i32, MockStore<String, i32>, MockLeases<String>> {
        Coordinator::builder::<String, i32>(Clock::new_frozen())
            .storage(MockStore::new())
            .result_slots(MockStore::new())
            .leases(MockLeases::new())
            .build()
    }

    #[test]
    fn publish_writes_slot_then_canonical() {
        block_on(async {
            let coordinator = coordinator();
            let key = "k".to_string();
            let config = FillConfig::default();
            let stopwatch = coordinator.clock().stopwatch();

            coordinator.publish(&key, 42, &config, &stopwatch).await;

            let slots = coordinator.inner.slots.as_ref().expect("slots configured");
            assert!(slots.contains_key(&key));
            assert!(coordinator.inner.store.contains_key(&key));
        });
    }

    #[test]
    fn publish_slot_carries_slot_ttl() {
        block_on(async {
            let coordinator = coordinator();
            let key = "k".to_string();
            let config = FillConfig::new()
                .with_entry_ttl(Duration::from_secs(100))
                .with_slot_ttl(Duration::from_secs(3));
            let stopwatch = coordinator.clock().stopwatch();

            coordinator.publish(&key, 42, &config, &stopwatch).await;

            let slots = coordinator.inner.slots.as_ref().expect("slots configured");
            let slot_entry = slots.get(&key).await.unwrap().expect("slot present");
            assert_eq!(slot_entry.ttl(), Some(Duration::from_secs(3)));

            let entry = coordinator.inner.store.get(&key).await.unwrap().expect("entry present");
            assert_eq!(entry.ttl(), Some(Duration::from_secs(100)));
        });
    }

    #[test]
    fn fill_releases_lease_on_computation_failure() {
        block_on(async {
            let coordinator = coordinator();
            let key = "k".to_string();
            let holder = HolderId::generate();
            let config = FillConfig::default();
            let stopwatch = coordinator.clock().stopwatch();

            assert!(coordinator.contend(&key, &holder, &config).await);
            let result = coordinator
                .fill(&key, &holder, &config, &stopwatch, || async {
                    Err::<i32, _>(std::io::Error::other("boom"))
                })
                .await;

            let error = result.expect_err("computation failed");
            assert!(error.is_computation_failed());
            // Released, not left to expire: the key is immediately fillable.
            assert!(coordinator.inner.leases.holder(&key).is_none());
            // Nothing was cached.
            assert!(!coordinator.inner.store.contains_key(&key));
        });
    }

    #[test]
    fn fill_adopts_recent_slot_commit_without_computing() {
        block_on(async {
            let coordinator = coordinator();
            let key = "k".to_string();
            let holder = HolderId::generate();
            let config = FillConfig::default();
            let stopwatch = coordinator.clock().stopwatch();

            let slots = coordinator.inner.slots.as_ref().expect("slots configured").clone();
            let mut slot_entry = CacheEntry::with_ttl(7, config.effective_slot_ttl());
            slot_entry.set_cached_at(coordinator.clock().system_time());
            slots.insert(&key, slot_entry).await.unwrap();

            assert!(coordinator.contend(&key, &holder, &config).await);
            let entry = coordinator
                .fill(&key, &holder, &config, &stopwatch, || async { Ok::<i32, std::io::Error>(0) })
                .await
                .expect("adopted");

            // 7 (the slot value), not 0: the computation never ran.
            assert_eq!(*entry.value(), 7);
            // The adopted value was promoted into the canonical store.
            assert!(coordinator.inner.store.contains_key(&key));
        });
    }

    #[test]
    fn promote_preserves_compute_timestamp() {
        block_on(async {
            let coordinator = coordinator();
            let key = "k".to_string();
            let config = FillConfig::default();

            let computed_at = coordinator.clock().system_time();
            let mut slot_entry = CacheEntry::with_ttl(7, Duration::from_secs(5));
            slot_entry.set_cached_at(computed_at);

            let entry = coordinator.promote(&key, slot_entry, &config).await;
            assert_eq!(entry.cached_at(), Some(computed_at));
            assert_eq!(entry.ttl(), Some(config.entry_ttl));
        });
    }
}
