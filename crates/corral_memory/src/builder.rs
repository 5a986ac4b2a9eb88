// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Builder for configuring in-memory stores.
//!
//! This module provides a builder API for `InMemoryStore` that abstracts the
//! underlying moka configuration, providing a stable API surface without
//! exposing moka's types.

use std::hash::Hash;
use std::marker::PhantomData;

use tick::Clock;

use crate::store::InMemoryStore;

/// Builder for configuring an `InMemoryStore`.
///
/// # Examples
///
/// ```
/// use corral_memory::InMemoryStore;
/// use tick::Clock;
///
/// let store = InMemoryStore::<String, i32>::builder(Clock::new_frozen())
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .name("user-store")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder<K, V> {
    pub(crate) clock: Clock,
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> InMemoryStoreBuilder<K, V> {
    /// Creates a new builder with default settings.
    ///
    /// The default configuration is an unbounded store whose entry expiry is
    /// checked against the given clock.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            max_capacity: None,
            initial_capacity: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the maximum capacity of the store.
    ///
    /// Once the capacity is reached, entries are evicted to make room using
    /// the `TinyLFU` eviction policy. If not set, the store is unbounded.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the initial capacity (pre-allocation hint) for the store.
    ///
    /// This can improve performance by avoiding reallocations during initial
    /// population. The store may still grow beyond this size.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a name for the store.
    ///
    /// This name may appear in logs or debugging output from the underlying
    /// cache implementation.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured `InMemoryStore`.
    #[must_use]
    pub fn build(self) -> InMemoryStore<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        InMemoryStore::from_builder(&self)
    }
}
