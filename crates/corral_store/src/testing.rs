// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Mock collaborators for testing.
//!
//! This module provides [`MockStore`] and [`MockLeases`], configurable
//! in-memory collaborators that record all operations and support failure
//! injection for testing error paths.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{CacheEntry, CacheStore, Error, HolderId, LeaseProvider};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp<K, V> {
    /// A get operation was performed with the given key.
    Get(K),
    /// An insert operation was performed with the given key and entry.
    Insert {
        /// The key that was inserted.
        key: K,
        /// The entry that was inserted.
        entry: CacheEntry<V>,
    },
    /// An invalidate operation was performed with the given key.
    Invalidate(K),
}

type StoreFailPredicate<K, V> = Box<dyn Fn(&StoreOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock cache store for testing.
///
/// Stores values in memory (without expiry handling; stamp and inspect entries
/// directly when a test needs TTL semantics) and can be configured to fail
/// operations on demand. All operations are recorded for later verification.
///
/// # Examples
///
/// ```
/// use corral_store::{testing::{MockStore, StoreOp}, CacheEntry, CacheStore};
///
/// # futures::executor::block_on(async {
/// let store = MockStore::<String, i32>::new();
///
/// store.insert(&"key".to_string(), CacheEntry::new(42)).await.unwrap();
/// let value = store.get(&"key".to_string()).await.unwrap();
/// assert_eq!(*value.unwrap().value(), 42);
///
/// assert_eq!(store.operations(), vec![
///     StoreOp::Insert { key: "key".to_string(), entry: CacheEntry::new(42) },
///     StoreOp::Get("key".to_string()),
/// ]);
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use corral_store::{testing::{MockStore, StoreOp}, CacheStore};
///
/// # futures::executor::block_on(async {
/// let store: MockStore<String, i32> = MockStore::new();
///
/// // Fail all get operations
/// store.fail_when(|op| matches!(op, StoreOp::Get(_)));
/// assert!(store.get(&"key".to_string()).await.is_err());
/// # });
/// ```
pub struct MockStore<K, V> {
    data: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    operations: Arc<Mutex<Vec<StoreOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<StoreFailPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for MockStore<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockStore<K, V> {
    /// Creates a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K, V> MockStore<K, V>
where
    K: Eq + Hash,
{
    /// Returns the number of entries in the store.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the store contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockStore<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should
    /// fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp<K, V>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &StoreOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<K, V> CacheStore<K, V> for MockStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        let op = StoreOp::Get(key.clone());
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::caused_by("mock: get failed"));
        }
        self.record(op);
        Ok(self.data.lock().get(key).cloned())
    }

    async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        let op = StoreOp::Insert {
            key: key.clone(),
            entry: entry.clone(),
        };
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::caused_by("mock: insert failed"));
        }
        self.record(op);
        self.data.lock().insert(key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        let op = StoreOp::Invalidate(key.clone());
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::caused_by("mock: invalidate failed"));
        }
        self.record(op);
        self.data.lock().remove(key);
        Ok(())
    }
}

/// Recorded lease operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOp<K> {
    /// An acquire was attempted for the given key.
    TryAcquire(K),
    /// A renew was attempted for the given key.
    Renew(K),
    /// A release was attempted for the given key.
    Release(K),
}

type LeaseFailPredicate<K> = Box<dyn Fn(&LeaseOp<K>) -> bool + Send + Sync>;

/// A configurable mock lease provider for testing.
///
/// Grants leases with real acquire-if-absent semantics but without TTL
/// tracking: a lease stays held until released or explicitly revoked with
/// [`revoke`](Self::revoke) (which stands in for expiry after a holder
/// crash). Operations are recorded, and failures can be injected to exercise
/// the treat-errors-as-denied contract.
///
/// # Examples
///
/// ```
/// use corral_store::{testing::MockLeases, HolderId, LeaseProvider};
/// use std::time::Duration;
///
/// # futures::executor::block_on(async {
/// let leases: MockLeases<String> = MockLeases::new();
/// let me = HolderId::generate();
/// let them = HolderId::generate();
/// let ttl = Duration::from_secs(5);
///
/// assert!(leases.try_acquire(&"k".to_string(), &me, ttl).await.unwrap());
/// assert!(!leases.try_acquire(&"k".to_string(), &them, ttl).await.unwrap());
///
/// leases.release(&"k".to_string(), &me).await.unwrap();
/// assert!(leases.try_acquire(&"k".to_string(), &them, ttl).await.unwrap());
/// # });
/// ```
pub struct MockLeases<K> {
    held: Arc<Mutex<HashMap<K, HolderId>>>,
    operations: Arc<Mutex<Vec<LeaseOp<K>>>>,
    fail_when: Arc<Mutex<Option<LeaseFailPredicate<K>>>>,
}

impl<K> std::fmt::Debug for MockLeases<K>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLeases")
            .field("held", &self.held)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K> Clone for MockLeases<K> {
    fn clone(&self) -> Self {
        Self {
            held: Arc::clone(&self.held),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K> Default for MockLeases<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> MockLeases<K> {
    /// Creates a new mock lease provider with no leases held.
    #[must_use]
    pub fn new() -> Self {
        Self {
            held: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K> MockLeases<K>
where
    K: Clone + Eq + Hash,
{
    /// Drops the lease for `key` regardless of holder.
    ///
    /// Stands in for TTL expiry after a crashed holder.
    pub fn revoke(&self, key: &K) {
        self.held.lock().remove(key);
    }

    /// Returns the current holder of the lease for `key`, if any.
    #[must_use]
    pub fn holder(&self, key: &K) -> Option<HolderId> {
        self.held.lock().get(key).cloned()
    }

    /// Sets a predicate that determines when operations should fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&LeaseOp<K>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<LeaseOp<K>> {
        self.operations.lock().clone()
    }

    fn record(&self, op: LeaseOp<K>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &LeaseOp<K>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<K> LeaseProvider<K> for MockLeases<K>
where
    K: Clone + Eq + Hash + Send + Sync,
{
    async fn try_acquire(&self, key: &K, holder: &HolderId, _ttl: std::time::Duration) -> Result<bool, Error> {
        let op = LeaseOp::TryAcquire(key.clone());
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::caused_by("mock: try_acquire failed"));
        }
        self.record(op);
        let mut held = self.held.lock();
        match held.get(key) {
            Some(current) => Ok(current == holder),
            None => {
                held.insert(key.clone(), holder.clone());
                Ok(true)
            }
        }
    }

    async fn renew(&self, key: &K, holder: &HolderId, _ttl: std::time::Duration) -> Result<bool, Error> {
        let op = LeaseOp::Renew(key.clone());
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::caused_by("mock: renew failed"));
        }
        self.record(op);
        Ok(self.held.lock().get(key) == Some(holder))
    }

    async fn release(&self, key: &K, holder: &HolderId) -> Result<(), Error> {
        let op = LeaseOp::Release(key.clone());
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::caused_by("mock: release failed"));
        }
        self.record(op);
        let mut held = self.held.lock();
        if held.get(key) == Some(holder) {
            held.remove(key);
        }
        Ok(())
    }
}
