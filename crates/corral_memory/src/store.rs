// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! In-memory cache store implementation using moka.

use std::hash::Hash;

use corral_store::{CacheEntry, CacheStore, Error};
use moka::future::Cache;
use tick::Clock;

use crate::builder::InMemoryStoreBuilder;

/// An in-memory cache store backed by moka.
///
/// Entries carry their own TTL; expiration is checked against the injected
/// [`Clock`] on every read, so a logically expired entry is reported as
/// absent (and lazily removed) even if moka still holds it. Eviction under
/// capacity pressure uses moka's `TinyLFU` policy.
///
/// Cloning is cheap and clones share the same underlying storage.
///
/// # Examples
///
/// ```
/// use corral_memory::InMemoryStore;
/// use corral_store::{CacheEntry, CacheStore};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let store = InMemoryStore::<String, i32>::new(Clock::new_frozen());
///
/// store.insert(&"key".to_string(), CacheEntry::new(42)).await?;
/// let value = store.get(&"key".to_string()).await?;
/// assert_eq!(*value.unwrap().value(), 42);
/// # Ok::<(), corral_store::Error>(())
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, CacheEntry<V>>,
    clock: Clock,
}

impl<K, V> std::fmt::Debug for InMemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl<K, V> InMemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new unbounded in-memory store.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self::builder(clock).build()
    }

    /// Creates a new in-memory store with a maximum capacity.
    ///
    /// Once the capacity is reached, entries are evicted using the `TinyLFU`
    /// policy (combination of LRU eviction and LFU admission).
    #[must_use]
    pub fn with_capacity(clock: Clock, max_capacity: u64) -> Self {
        Self::builder(clock).max_capacity(max_capacity).build()
    }

    /// Creates a new builder for configuring an in-memory store.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral_memory::InMemoryStore;
    /// use tick::Clock;
    ///
    /// let store = InMemoryStore::<String, i32>::builder(Clock::new_frozen())
    ///     .max_capacity(1000)
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder(clock: Clock) -> InMemoryStoreBuilder<K, V> {
        InMemoryStoreBuilder::new(clock)
    }

    /// Returns the number of entries currently held, including entries that
    /// are logically expired but not yet removed.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Constructs an `InMemoryStore` from a builder.
    pub(crate) fn from_builder(builder: &InMemoryStoreBuilder<K, V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
            clock: builder.clock.clone(),
        }
    }
}

impl<K, V> CacheStore<K, V> for InMemoryStore<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        match self.inner.get(key).await {
            Some(entry) if entry.is_expired_at(self.clock.system_time()) => {
                // Lazy removal; the next writer would replace it anyway.
                self.inner.invalidate(key).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn insert(&self, key: &K, mut entry: CacheEntry<V>) -> Result<(), Error> {
        entry.ensure_cached_at(self.clock.system_time());
        self.inner.insert(key.clone(), entry).await;
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.inner.invalidate(key).await;
        Ok(())
    }
}
