// Copyright (c) The Corral Project Authors.

//! In-memory collaborators for the corral cache-population coordinator.
//!
//! This crate provides [`InMemoryStore`], a concurrent in-memory cache store
//! backed by moka with clock-checked expiration, and [`InMemoryLeases`], a
//! lease provider over a synchronized map with clock-checked lease expiry.
//! Both take a [`tick::Clock`] so that expiration is fully controllable in
//! tests.
//!
//! These implementations satisfy the collaborator contracts exactly as a
//! remote key/value store or lock service would, which makes them suitable
//! both for single-process deployments and as reference implementations when
//! writing drivers for external backends.
//!
//! # Quick Start
//!
//! ```
//! use corral_memory::InMemoryStore;
//! use corral_store::{CacheEntry, CacheStore};
//! use std::time::Duration;
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let clock = Clock::new_frozen();
//! let store = InMemoryStore::<String, i32>::new(clock);
//!
//! store.insert(&"key".to_string(), CacheEntry::with_ttl(42, Duration::from_secs(60))).await?;
//! let value = store.get(&"key".to_string()).await?;
//! assert_eq!(*value.unwrap().value(), 42);
//! # Ok::<(), corral_store::Error>(())
//! # });
//! ```

pub mod builder;
mod lease;
mod store;

#[doc(inline)]
pub use builder::InMemoryStoreBuilder;
#[doc(inline)]
pub use lease::InMemoryLeases;
#[doc(inline)]
pub use store::InMemoryStore;
