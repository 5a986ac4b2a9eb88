// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! In-memory lease provider implementation.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::Arc,
    time::{Duration, SystemTime},
};

use corral_store::{Error, HolderId, LeaseProvider};
use parking_lot::Mutex;
use tick::Clock;

#[derive(Debug, Clone)]
struct LeaseRecord {
    holder: HolderId,
    expires_at: SystemTime,
}

impl LeaseRecord {
    fn is_live_at(&self, now: SystemTime) -> bool {
        self.expires_at > now
    }
}

/// An in-process lease provider over a synchronized map.
///
/// Implements the acquire-if-absent-with-TTL protocol of [`LeaseProvider`]:
/// a lease is granted when no live lease exists for the key, renewals and
/// releases compare the holder identity, and expired leases are dropped
/// lazily on the next operation that touches them. Expiry is checked against
/// the injected [`Clock`].
///
/// Cloning is cheap and clones share the same lease table, so a cloned
/// provider behaves like another client of the same lock service.
///
/// # Examples
///
/// ```
/// use corral_memory::InMemoryLeases;
/// use corral_store::{HolderId, LeaseProvider};
/// use std::time::Duration;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let leases: InMemoryLeases<String> = InMemoryLeases::new(Clock::new_frozen());
/// let me = HolderId::generate();
/// let them = HolderId::generate();
///
/// assert!(leases.try_acquire(&"k".to_string(), &me, Duration::from_secs(5)).await?);
/// assert!(!leases.try_acquire(&"k".to_string(), &them, Duration::from_secs(5)).await?);
/// # Ok::<(), corral_store::Error>(())
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryLeases<K> {
    inner: Arc<Mutex<HashMap<K, LeaseRecord>>>,
    clock: Clock,
}

impl<K> std::fmt::Debug for InMemoryLeases<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLeases")
            .field("held", &self.inner.lock().len())
            .finish_non_exhaustive()
    }
}

impl<K> InMemoryLeases<K> {
    /// Creates a new lease provider with no leases held.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }
}

impl<K> InMemoryLeases<K>
where
    K: Eq + Hash,
{
    /// Returns `true` if a live lease exists for `key`.
    #[must_use]
    pub fn is_held(&self, key: &K) -> bool {
        let now = self.clock.system_time();
        self.inner.lock().get(key).is_some_and(|record| record.is_live_at(now))
    }
}

impl<K> LeaseProvider<K> for InMemoryLeases<K>
where
    K: Clone + Eq + Hash + Send + Sync,
{
    async fn try_acquire(&self, key: &K, holder: &HolderId, ttl: Duration) -> Result<bool, Error> {
        let now = self.clock.system_time();
        let mut leases = self.inner.lock();

        let granted = match leases.get(key) {
            // Re-acquiring your own live lease extends it.
            Some(record) if record.is_live_at(now) => record.holder == *holder,
            _ => true,
        };

        if granted {
            leases.insert(
                key.clone(),
                LeaseRecord {
                    holder: holder.clone(),
                    expires_at: now + ttl,
                },
            );
        }

        Ok(granted)
    }

    async fn renew(&self, key: &K, holder: &HolderId, ttl: Duration) -> Result<bool, Error> {
        let now = self.clock.system_time();
        let mut leases = self.inner.lock();

        let renewed = match leases.get_mut(key) {
            Some(record) if record.is_live_at(now) && record.holder == *holder => {
                record.expires_at = now + ttl;
                true
            }
            _ => false,
        };

        // Drop an expired record so the key can be re-acquired cleanly.
        if !renewed && leases.get(key).is_some_and(|record| !record.is_live_at(now)) {
            leases.remove(key);
        }

        Ok(renewed)
    }

    async fn release(&self, key: &K, holder: &HolderId) -> Result<(), Error> {
        let mut leases = self.inner.lock();
        if leases.get(key).is_some_and(|record| record.holder == *holder) {
            leases.remove(key);
        }
        Ok(())
    }
}
