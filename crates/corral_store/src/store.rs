// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! The cache store collaborator contract.

use crate::{CacheEntry, Error};

/// Contract for the durable key/value store the coordinator populates.
///
/// Implement this trait to plug in a storage backend. The coordinator never
/// assumes read-then-write atomicity across these operations; atomicity is the
/// [`LeaseProvider`](crate::LeaseProvider)'s job.
///
/// All operations are fallible: an unreachable backend returns an error, which
/// the coordinator treats as a miss rather than failing the caller.
pub trait CacheStore<K, V>: Send + Sync {
    /// Gets a value. Logically expired entries are reported as absent.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<CacheEntry<V>>, Error>> + Send;

    /// Inserts a value, unconditionally replacing any existing entry.
    ///
    /// The entry carries its own TTL; implementations stamp `cached_at` at
    /// write time if the entry does not already have one. Must be idempotent.
    fn insert(&self, key: &K, entry: CacheEntry<V>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes a value. Removing an absent key is not an error.
    fn invalidate(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;
}
