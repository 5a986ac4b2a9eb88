// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! The waiter role: poll for a coalesced result until the deadline.

use std::{hash::Hash, time::Duration};

use corral_store::{CacheEntry, CacheStore, LeaseProvider};

use crate::{FillConfig, coordinator::Coordinator};

impl<K, V, S, L> Coordinator<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    /// Polls for a result committed by the active filler.
    ///
    /// Checks the canonical entry, then the result slot; whichever appears
    /// first is adopted. A value found only in the slot is written through to
    /// the canonical entry so later readers hit.
    ///
    /// Returns `None` once the wait deadline elapses without a result. The
    /// deadline is measured from this waiter's own start and is independent
    /// of the filler's lease TTL. Collaborator failures read as "not yet";
    /// the deadline bounds how long that can go on.
    pub(crate) async fn wait_for_result(&self, key: &K, config: &FillConfig) -> Option<CacheEntry<V>> {
        let waited = self.inner.clock.stopwatch();

        loop {
            if let Some(entry) = self.probe(key).await {
                return Some(entry);
            }

            if let Some(slots) = &self.inner.slots {
                if let Ok(Some(slot_entry)) = slots.get(key).await {
                    return Some(self.promote(key, slot_entry, config).await);
                }
            }

            let elapsed = waited.elapsed();
            if elapsed >= config.wait_deadline {
                return None;
            }

            // Cap the sleep to the remaining budget so the deadline binds
            // tightly, not at deadline-plus-one-interval.
            let remaining = config.wait_deadline - elapsed;
            let sleep = jittered(config.poll_interval).min(remaining);
            self.inner.clock.delay(sleep).await;
        }
    }
}

/// Lengthens the polling interval by a bounded random amount (up to half the
/// interval) so waiters across the fleet do not poll in lockstep.
fn jittered(interval: Duration) -> Duration {
    let half = interval / 2;
    if half.is_zero() {
        return interval;
    }
    let jitter_ns = fastrand::u64(0..u64::try_from(half.as_nanos()).unwrap_or(u64::MAX));
    interval + Duration::from_nanos(jitter_ns)
}
