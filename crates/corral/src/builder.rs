// Copyright (c) The Corral Project Authors.

//! Coordinator builder.
//!
//! The builder wires the clock, the collaborators, and the default fill
//! configuration together. Nothing is global: lifecycle belongs to whoever
//! constructs the coordinator.

use std::{hash::Hash, marker::PhantomData, time::Duration};

use tick::Clock;

use corral_store::{CacheStore, LeaseProvider};

use crate::{Coordinator, DeadlinePolicy, FillConfig};

#[cfg(feature = "memory")]
use corral_memory::{InMemoryLeases, InMemoryStore};

/// Builder for constructing a [`Coordinator`].
///
/// Created by calling [`Coordinator::builder`]. Storage and leases must be
/// provided (or use [`memory()`](Self::memory) to wire in-memory
/// collaborators); everything else has defaults.
///
/// # Examples
///
/// ```
/// use corral::Coordinator;
/// use std::time::Duration;
/// use tick::Clock;
///
/// let clock = Clock::new_frozen();
/// let coordinator = Coordinator::builder::<String, String>(clock)
///     .memory()
///     .fill_ttl(Duration::from_secs(5))
///     .wait_deadline(Duration::from_secs(3))
///     .build();
/// ```
#[derive(Debug)]
pub struct CoordinatorBuilder<K, V, S = (), L = ()> {
    name: Option<&'static str>,
    clock: Clock,
    storage: S,
    slots: Option<S>,
    leases: L,
    config: FillConfig,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> CoordinatorBuilder<K, V, (), ()> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            name: None,
            clock,
            storage: (),
            slots: None,
            leases: (),
            config: FillConfig::default(),
            _phantom: PhantomData,
        }
    }

    /// Wires in-memory collaborators: a canonical store, a result-slot store,
    /// and a lease provider, all driven by the builder's clock.
    ///
    /// This is the single-process configuration; it exercises exactly the
    /// same protocol a distributed deployment would.
    #[cfg(feature = "memory")]
    #[must_use]
    pub fn memory(self) -> CoordinatorBuilder<K, V, InMemoryStore<K, V>, InMemoryLeases<K>>
    where
        K: Clone + Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let store = InMemoryStore::new(self.clock.clone());
        let slots = InMemoryStore::new(self.clock.clone());
        let leases = InMemoryLeases::new(self.clock.clone());
        self.storage(store).result_slots(slots).leases(leases)
    }
}

impl<K, V, L> CoordinatorBuilder<K, V, (), L> {
    /// Sets the canonical cache store.
    pub fn storage<S>(self, storage: S) -> CoordinatorBuilder<K, V, S, L>
    where
        S: CacheStore<K, V>,
    {
        CoordinatorBuilder {
            name: self.name,
            clock: self.clock,
            storage,
            slots: None,
            leases: self.leases,
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

impl<K, V, S> CoordinatorBuilder<K, V, S, ()> {
    /// Sets the lease provider.
    pub fn leases<L>(self, leases: L) -> CoordinatorBuilder<K, V, S, L>
    where
        L: LeaseProvider<K>,
    {
        CoordinatorBuilder {
            name: self.name,
            clock: self.clock,
            storage: self.storage,
            slots: self.slots,
            leases,
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

impl<K, V, S, L> CoordinatorBuilder<K, V, S, L> {
    /// Sets the result-slot store used to hand freshly computed values to
    /// coalesced waiters.
    ///
    /// This must be a handle distinct from the canonical store — typically
    /// the same backend under a different key namespace (the driver's
    /// concern). Without one, waiters coalesce on the canonical entry alone.
    #[must_use]
    pub fn result_slots(mut self, slots: S) -> Self
    where
        S: CacheStore<K, V>,
    {
        self.slots = Some(slots);
        self
    }

    /// Sets the name used for telemetry identification.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Replaces the whole default fill configuration.
    #[must_use]
    pub fn config(mut self, config: FillConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the lease TTL for fillers. See [`FillConfig::fill_ttl`].
    #[must_use]
    pub fn fill_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_fill_ttl(ttl);
        self
    }

    /// Sets the TTL of committed entries. See [`FillConfig::entry_ttl`].
    #[must_use]
    pub fn entry_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_entry_ttl(ttl);
        self
    }

    /// Sets the waiter deadline. See [`FillConfig::wait_deadline`].
    #[must_use]
    pub fn wait_deadline(mut self, deadline: Duration) -> Self {
        self.config = self.config.with_wait_deadline(deadline);
        self
    }

    /// Sets the waiter polling interval. See [`FillConfig::poll_interval`].
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_poll_interval(interval);
        self
    }

    /// Sets the result-slot TTL. See [`FillConfig::slot_ttl`].
    #[must_use]
    pub fn slot_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_slot_ttl(ttl);
        self
    }

    /// Enables early refresh. See [`FillConfig::refresh_after`].
    #[must_use]
    pub fn refresh_after(mut self, soft_expiry: Duration) -> Self {
        self.config = self.config.with_refresh_after(soft_expiry);
        self
    }

    /// Sets the deadline policy. See [`FillConfig::on_deadline`].
    #[must_use]
    pub fn on_deadline(mut self, policy: DeadlinePolicy) -> Self {
        self.config = self.config.with_deadline_policy(policy);
        self
    }

    /// Returns a reference to the builder's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}

impl<K, V, S, L> CoordinatorBuilder<K, V, S, L>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: CacheStore<K, V> + 'static,
    L: LeaseProvider<K> + 'static,
{
    /// Builds the coordinator with the configured collaborators and settings.
    pub fn build(self) -> Coordinator<K, V, S, L> {
        Coordinator::new(
            self.name.unwrap_or("coordinator"),
            self.storage,
            self.slots,
            self.leases,
            self.clock,
            self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_store::testing::{MockLeases, MockStore};

    #[test]
    fn builder_applies_config_setters() {
        let coordinator = Coordinator::builder::<String, i32>(Clock::new_frozen())
            .storage(MockStore::new())
            .leases(MockLeases::new())
            .name("users")
            .fill_ttl(Duration::from_secs(5))
            .entry_ttl(Duration::from_secs(60))
            .wait_deadline(Duration::from_secs(3))
            .poll_interval(Duration::from_millis(25))
            .slot_ttl(Duration::from_secs(4))
            .on_deadline(DeadlinePolicy::Fail)
            .build();

        assert_eq!(coordinator.name(), "users");
        let config = coordinator.config();
        assert_eq!(config.fill_ttl, Duration::from_secs(5));
        assert_eq!(config.entry_ttl, Duration::from_secs(60));
        assert_eq!(config.wait_deadline, Duration::from_secs(3));
        assert_eq!(config.poll_interval, Duration::from_millis(25));
        assert_eq!(config.slot_ttl, Some(Duration::from_secs(4)));
        assert_eq!(config.on_deadline, DeadlinePolicy::Fail);
    }

    #[test]
    fn builder_defaults_the_name() {
        let coordinator = Coordinator::builder::<String, i32>(Clock::new_frozen())
            .storage(MockStore::new())
            .leases(MockLeases::new())
            .build();

        assert_eq!(coordinator.name(), "coordinator");
    }

    #[cfg(feature = "memory")]
    #[test]
    fn memory_wires_all_collaborators() {
        let coordinator = Coordinator::builder::<String, i32>(Clock::new_frozen()).memory().build();
        assert!(coordinator.inner.slots.is_some());
    }
}
