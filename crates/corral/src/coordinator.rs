// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! The coordinator type and its fill state machine.

use std::{fmt::Debug, hash::Hash, marker::PhantomData, sync::Arc};

use tick::Clock;

use corral_store::{CacheEntry, CacheStore, Error, HolderId, LeaseProvider};

use crate::{
    DeadlinePolicy, FillConfig, FillError, FillErrorKind,
    builder::CoordinatorBuilder,
    telemetry::{self, FillActivity},
};

#[cfg(feature = "tokio")]
use crate::{refresh::RefreshTracker, runtime::Runtime};

/// Shared state behind a coordinator handle.
///
/// The coordinator holds no per-key mutable state of its own: everything that
/// must be visible across callers (entries, result slots, leases) lives in
/// the collaborators, which are assumed safe for concurrent use by many
/// callers across many processes.
pub(crate) struct Inner<K, V, S, L> {
    pub(crate) name: &'static str,
    pub(crate) store: S,
    pub(crate) slots: Option<S>,
    pub(crate) leases: L,
    pub(crate) clock: Clock,
    pub(crate) config: FillConfig,
    #[cfg(feature = "tokio")]
    pub(crate) runtime: Runtime,
    #[cfg(feature = "tokio")]
    pub(crate) refresh: RefreshTracker<K>,
    pub(crate) _phantom: PhantomData<(K, V)>,
}

impl<K, V, S, L> Debug for Inner<K, V, S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A stampede-safe cache-population coordinator.
///
/// `Coordinator` orchestrates a [`CacheStore`], a [`LeaseProvider`], and a
/// caller-supplied computation so that for any single key the expensive
/// computation runs at most once per miss episode (with a healthy lease
/// provider), while all concurrent callers receive the same result within a
/// bounded time.
///
/// A [`get_or_fill`](Self::get_or_fill) call takes one of three roles:
///
/// - **Hit**: the canonical entry is present and fresh; it is returned with
///   no lease traffic at all.
/// - **Filler**: on a miss, the caller that wins the lease computes the
///   value, publishes it to the result slot and the canonical entry, and
///   releases the lease.
/// - **Waiter**: callers denied the lease poll for the filler's result and
///   adopt it. A waiter whose deadline elapses re-contends for the lease and
///   then falls back per [`DeadlinePolicy`].
///
/// Cloning is cheap; clones share the same collaborators and configuration.
///
/// # Examples
///
/// ```
/// use corral::Coordinator;
/// use std::time::Duration;
/// use tick::Clock;
///
/// # async fn example() -> Result<(), corral::FillError> {
/// let clock = Clock::new_tokio();
/// let coordinator = Coordinator::builder::<String, String>(clock)
///     .memory()
///     .fill_ttl(Duration::from_secs(5))
///     .entry_ttl(Duration::from_secs(60))
///     .build();
///
/// let entry = coordinator
///     .get_or_fill(&"user:123".to_string(), || async {
///         // This expensive computation runs at most once per miss episode,
///         // no matter how many callers race on the key.
///         Ok::<_, std::io::Error>("profile".to_string())
///     })
///     .await?;
/// assert_eq!(*entry.value(), "profile");
/// # Ok(())
/// # }
/// ```
pub struct Coordinator<K, V, S, L> {
    pub(crate) inner: Arc<Inner<K, V, S, L>>,
}

impl<K, V, S, L> Clone for Coordinator<K, V, S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, S, L> Debug for Coordinator<K, V, S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator").field("name", &self.inner.name).finish_non_exhaustive()
    }
}

impl Coordinator<(), (), (), ()> {
    /// Creates a new coordinator builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::Coordinator;
    /// use tick::Clock;
    ///
    /// let clock = Clock::new_frozen();
    /// let coordinator = Coordinator::builder::<String, i32>(clock).memory().build();
    /// ```
    #[must_use]
    pub fn builder<K, V>(clock: Clock) -> CoordinatorBuilder<K, V> {
        CoordinatorBuilder::new(clock)
    }
}

/// Accessors.
impl<K, V, S, L> Coordinator<K, V, S, L> {
    /// Returns the name of this coordinator for telemetry identification.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns a reference to the coordinator's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Returns the default fill configuration.
    #[must_use]
    pub fn config(&self) -> &FillConfig {
        &self.inner.config
    }

    /// Returns a reference to the canonical store.
    ///
    /// This allows accessing store-specific functionality not exposed by the
    /// coordinator API.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.inner.store
    }

    /// Returns a reference to the result-slot store, if one is configured.
    #[must_use]
    pub fn result_slots(&self) -> Option<&S> {
        self.inner.slots.as_ref()
    }

    /// Returns a reference to the lease provider.
    #[must_use]
    pub fn leases(&self) -> &L {
        &self.inner.leases
    }
}

impl<K, V, S, L> Coordinator<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    pub(crate) fn new(name: &'static str, store: S, slots: Option<S>, leases: L, clock: Clock, config: FillConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                store,
                slots,
                leases,
                clock,
                config,
                #[cfg(feature = "tokio")]
                runtime: Runtime::new_tokio(),
                #[cfg(feature = "tokio")]
                refresh: RefreshTracker::new(),
                _phantom: PhantomData,
            }),
        }
    }

    /// Retrieves a value from the canonical store without any fill logic.
    ///
    /// Returns `None` if the key is absent or logically expired. This is a
    /// plain probe: no lease traffic, no refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        self.inner.store.get(key).await
    }

    /// Inserts a value into the canonical store.
    ///
    /// The entry's TTL is taken as given; entries without a TTL never expire.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        self.inner.store.insert(key, entry).await
    }

    /// Invalidates the canonical entry and any lingering result slot, so a
    /// stale slot cannot resurrect the removed value for coalesced waiters.
    ///
    /// # Errors
    ///
    /// Returns an error if either store operation fails.
    pub async fn invalidate(&self, key: &K) -> Result<(), Error> {
        if let Some(slots) = &self.inner.slots {
            slots.invalidate(key).await?;
        }
        self.inner.store.invalidate(key).await
    }

    /// Retrieves a value from cache, or computes and caches it with stampede
    /// protection, using the coordinator's default configuration.
    ///
    /// See [`get_or_fill_with`](Self::get_or_fill_with).
    ///
    /// # Errors
    ///
    /// Returns [`FillError`] when the computation fails or the wait deadline
    /// elapses without a result; see [`FillErrorKind`].
    pub async fn get_or_fill<F, Fut, E>(&self, key: &K, f: F) -> Result<CacheEntry<V>, FillError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.get_or_fill_with(key, self.inner.config, f).await
    }

    /// Retrieves a value from cache, or computes and caches it with stampede
    /// protection, using an explicit configuration for this call.
    ///
    /// On a miss, exactly one caller per miss episode acquires the fill
    /// lease and runs `f`; concurrent callers for the same key wait for the
    /// result instead of recomputing it. A successful computation is written
    /// to the result slot and the canonical entry; a failed one is surfaced
    /// to this caller only and never cached.
    ///
    /// Collaborator failures are absorbed: an unreachable store reads as a
    /// miss, an unreachable lease provider as "someone else may be filling".
    /// The call fails only for the reasons captured by [`FillErrorKind`].
    ///
    /// With `refresh_after` configured (and the `tokio` feature enabled), an
    /// entry past its soft expiry is returned immediately while `f` is moved
    /// into a background fill, so callers never block on a refresh.
    ///
    /// # Errors
    ///
    /// Returns [`FillError`] when the computation fails or the wait deadline
    /// elapses without a result; see [`FillErrorKind`].
    pub async fn get_or_fill_with<F, Fut, E>(&self, key: &K, config: FillConfig, f: F) -> Result<CacheEntry<V>, FillError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let stopwatch = self.inner.clock.stopwatch();

        // Fast path: a live entry costs no lease traffic.
        if let Some(entry) = self.probe(key).await {
            #[cfg(feature = "tokio")]
            if self.is_soft_expired(&entry, &config) {
                self.spawn_refresh(key, config, f, &stopwatch);
                telemetry::record(self.inner.name, FillActivity::StaleServed, stopwatch.elapsed());
                return Ok(entry);
            }
            telemetry::record(self.inner.name, FillActivity::Hit, stopwatch.elapsed());
            return Ok(entry);
        }

        let holder = HolderId::generate();
        if self.contend(key, &holder, &config).await {
            return self.fill(key, &holder, &config, &stopwatch, f).await;
        }

        if let Some(entry) = self.wait_for_result(key, &config).await {
            telemetry::record(self.inner.name, FillActivity::Coalesced, stopwatch.elapsed());
            return Ok(entry);
        }

        self.deadline_fallback(key, config, &stopwatch, f).await
    }

    /// Probes the canonical store, treating collaborator failures as misses.
    pub(crate) async fn probe(&self, key: &K) -> Option<CacheEntry<V>> {
        self.inner.store.get(key).await.ok().flatten()
    }

    /// Contends for fill rights. Provider failures read as denied: false
    /// concurrency costs a duplicate computation, false exclusivity can
    /// wedge every caller of the key.
    pub(crate) async fn contend(&self, key: &K, holder: &HolderId, config: &FillConfig) -> bool {
        self.inner
            .leases
            .try_acquire(key, holder, config.fill_ttl)
            .await
            .unwrap_or(false)
    }

    /// Returns `true` when `entry` is past the configured soft expiry.
    ///
    /// An unstamped entry counts as soft-expired: without a write timestamp
    /// its age is unknowable, and refreshing is the safe direction.
    pub(crate) fn is_soft_expired(&self, entry: &CacheEntry<V>, config: &FillConfig) -> bool {
        config
            .refresh_after
            .is_some_and(|soft_expiry| entry.age(self.inner.clock.system_time()).is_none_or(|age| age >= soft_expiry))
    }

    /// The escape valve: the wait deadline elapsed with no observable result.
    ///
    /// The filler may have crashed and its lease expired, so fill rights are
    /// contested once more; after that the configured policy decides between
    /// a leaseless self-computation and a typed timeout.
    async fn deadline_fallback<F, Fut, E>(
        &self,
        key: &K,
        config: FillConfig,
        stopwatch: &tick::Stopwatch,
        f: F,
    ) -> Result<CacheEntry<V>, FillError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let holder = HolderId::generate();
        if self.contend(key, &holder, &config).await {
            return self.fill(key, &holder, &config, stopwatch, f).await;
        }

        match config.on_deadline {
            DeadlinePolicy::SelfCompute => self.self_compute(key, &config, stopwatch, f).await,
            DeadlinePolicy::Fail => {
                telemetry::record(self.inner.name, FillActivity::DeadlineFailed, stopwatch.elapsed());
                Err(FillError::new(FillErrorKind::DeadlineExceeded))
            }
        }
    }

    /// Computes the value without a lease, accepting a possible duplicate
    /// computation rather than blocking past the deadline.
    ///
    /// The canonical entry is committed (later readers should hit), but the
    /// result slot is left alone: without the lease this caller must not
    /// clobber a live filler's hand-off.
    async fn self_compute<F, Fut, E>(
        &self,
        key: &K,
        config: &FillConfig,
        stopwatch: &tick::Stopwatch,
        f: F,
    ) -> Result<CacheEntry<V>, FillError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        match f().await {
            Ok(value) => {
                let mut entry = CacheEntry::with_ttl(value, config.entry_ttl);
                entry.set_cached_at(self.inner.clock.system_time());
                if self.inner.store.insert(key, entry.clone()).await.is_err() {
                    telemetry::record(self.inner.name, FillActivity::CommitSkipped, stopwatch.elapsed());
                }
                telemetry::record(self.inner.name, FillActivity::EscapeComputed, stopwatch.elapsed());
                Ok(entry)
            }
            Err(error) => {
                telemetry::record(self.inner.name, FillActivity::DeadlineFailed, stopwatch.elapsed());
                Err(FillError::caused_by(FillErrorKind::DeadlineExceeded, error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_store::testing::{MockLeases, MockStore};

    static_assertions::assert_impl_all!(
        Coordinator<String, i32, MockStore<String, i32>, MockLeases<String>>: Send, Sync, Clone, Debug
    );

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn coordinator() -> Coordinator<String, i32, MockStore<String, i32>, MockLeases<String>> {
        Coordinator::builder::<String, i32>(Clock::new_frozen())
            .storage(MockStore::new())
            .leases(MockLeases::new())
            .build()
    }

    #[test]
    fn probe_treats_store_error_as_miss() {
        block_on(async {
            let coordinator = coordinator();
            let store = coordinator.inner.store.clone();
            store.insert(&"k".to_string(), CacheEntry::new(1)).await.unwrap();
            store.fail_when(|_| true);

            assert!(coordinator.probe(&"k".to_string()).await.is_none());
        });
    }

    #[test]
    fn contend_treats_provider_error_as_denied() {
        block_on(async {
            let coordinator = coordinator();
            coordinator.inner.leases.fail_when(|_| true);

            let holder = HolderId::generate();
            assert!(!coordinator.contend(&"k".to_string(), &holder, &FillConfig::default()).await);
        });
    }

    #[test]
    fn soft_expiry_checks_entry_age() {
        let control = tick::ClockControl::new();
        let coordinator = Coordinator::builder::<String, i32>(control.to_clock())
            .storage(MockStore::new())
            .leases(MockLeases::new())
            .build();
        let config = FillConfig::new().with_refresh_after(std::time::Duration::from_secs(5));

        let mut entry = CacheEntry::new(1);
        entry.set_cached_at(coordinator.clock().system_time());
        assert!(!coordinator.is_soft_expired(&entry, &config));

        control.advance(std::time::Duration::from_secs(5));
        assert!(coordinator.is_soft_expired(&entry, &config));
    }

    #[test]
    fn unstamped_entry_is_soft_expired() {
        let coordinator = coordinator();
        let config = FillConfig::new().with_refresh_after(std::time::Duration::from_secs(5));
        assert!(coordinator.is_soft_expired(&CacheEntry::new(1), &config));
    }

    #[test]
    fn invalidate_clears_slot_too() {
        block_on(async {
            let store = MockStore::new();
            let slots = MockStore::new();
            let coordinator = Coordinator::builder::<String, i32>(Clock::new_frozen())
                .storage(store.clone())
                .result_slots(slots.clone())
                .leases(MockLeases::new())
                .build();

            let key = "k".to_string();
            store.insert(&key, CacheEntry::new(1)).await.unwrap();
            slots.insert(&key, CacheEntry::new(1)).await.unwrap();

            coordinator.invalidate(&key).await.unwrap();
            assert!(!store.contains_key(&key));
            assert!(!slots.contains_key(&key));
        });
    }
}
