// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! A stampede-safe distributed cache-population coordinator.
//!
//! When a popular cache entry expires, every concurrent reader observes the
//! miss at once and — without coordination — recomputes the same expensive
//! value in a thundering herd. This crate coordinates cache population so
//! that for any single key the computation runs **at most once per miss
//! episode**, while all concurrent callers receive the same result within a
//! bounded time.
//!
//! The coordinator works against two small contracts from [`corral_store`]:
//! a [`CacheStore`] (durable key/value storage with per-entry expiration) and
//! a [`LeaseProvider`] (an atomic acquire-if-absent-with-TTL lock). Any
//! key/value system and any distributed lock mechanism satisfying those
//! contracts can back it; [`corral_memory`] provides in-process
//! implementations.
//!
//! # How a fill works
//!
//! 1. **Probe**: a live canonical entry is returned immediately, with no
//!    lease traffic.
//! 2. **Contend**: on a miss, callers race for the fill lease. The winner
//!    computes, publishes the value (result slot first, then the canonical
//!    entry), and releases the lease. Everyone else polls — with jitter —
//!    for the value to appear and adopts it.
//! 3. **Escape valve**: a waiter that sees nothing by its deadline
//!    re-contends for the lease, and then either computes without a lease or
//!    fails with a typed timeout, per [`DeadlinePolicy`]. A crashed filler
//!    therefore degrades to a temporary duplicate computation, never a
//!    deadlock; computation failures are surfaced, never cached.
//!
//! # Example
//!
//! ```
//! use corral::Coordinator;
//! use std::time::Duration;
//! use tick::Clock;
//!
//! # async fn example() -> Result<(), corral::FillError> {
//! let clock = Clock::new_tokio();
//! let coordinator = Coordinator::builder::<String, String>(clock)
//!     .memory()
//!     .fill_ttl(Duration::from_secs(5))
//!     .entry_ttl(Duration::from_secs(60))
//!     .wait_deadline(Duration::from_secs(3))
//!     .build();
//!
//! let entry = coordinator
//!     .get_or_fill(&"report:today".to_string(), || async {
//!         Ok::<_, std::io::Error>("rendered".to_string())
//!     })
//!     .await?;
//! assert_eq!(*entry.value(), "rendered");
//! # Ok(())
//! # }
//! ```
//!
//! # Early refresh
//!
//! With [`FillConfig::refresh_after`] set, an entry older than the soft
//! expiry (but still within its TTL) is served immediately while one
//! background fill is triggered through the same lease contention. Serving
//! decouples from refreshing: readers get bounded staleness instead of
//! latency spikes.

mod builder;
mod config;
mod coordinator;
mod error;
mod fill;
#[cfg(feature = "tokio")]
mod refresh;
#[cfg(feature = "tokio")]
mod runtime;
mod telemetry;
mod waiter;

#[doc(inline)]
pub use builder::CoordinatorBuilder;
#[doc(inline)]
pub use config::{DeadlinePolicy, FillConfig};
#[doc(inline)]
pub use coordinator::Coordinator;
#[cfg(feature = "memory")]
#[doc(inline)]
pub use corral_memory::{InMemoryLeases, InMemoryStore, InMemoryStoreBuilder};
#[doc(inline)]
pub use corral_store::{CacheEntry, CacheStore, Error, HolderId, LeaseProvider, Result};
#[doc(inline)]
pub use error::{FillError, FillErrorKind};

#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use corral_store::testing::{LeaseOp, MockLeases, MockStore, StoreOp};
