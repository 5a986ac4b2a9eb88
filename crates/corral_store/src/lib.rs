// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Collaborator contracts for the corral cache-population coordinator.
//!
//! This crate defines the two external contracts the coordinator orchestrates:
//! [`CacheStore`] for durable key/value storage with per-entry expiration, and
//! [`LeaseProvider`] for time-bounded distributed mutual exclusion. It also
//! provides [`CacheEntry`] for values with expiration metadata, [`HolderId`]
//! for opaque lease-holder identities, and [`Error`] for fallible operations.
//!
//! # Overview
//!
//! The contracts deliberately demand very little of the backing technology:
//! the store needs unconditional upserts and expiry-aware reads, the lease
//! provider needs an atomic acquire-if-absent with a TTL. Any key/value system
//! and any distributed lock mechanism satisfying these two traits can back the
//! coordinator with no coordinator changes.
//!
//! # Implementing a Cache Store
//!
//! ```
//! use corral_store::{CacheEntry, CacheStore, Error};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct SimpleStore<K, V>(RwLock<HashMap<K, CacheEntry<V>>>);
//!
//! impl<K, V> CacheStore<K, V> for SimpleStore<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned())
//!     }
//!
//!     async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
//!         self.0.write().unwrap().insert(key.clone(), entry);
//!         Ok(())
//!     }
//!
//!     async fn invalidate(&self, key: &K) -> Result<(), Error> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(())
//!     }
//! }
//! ```

mod entry;
pub mod error;
mod lease;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use lease::{HolderId, LeaseProvider};
#[doc(inline)]
pub use store::CacheStore;
