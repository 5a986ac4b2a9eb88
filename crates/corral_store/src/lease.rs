// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! The lease provider collaborator contract.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::Error;

/// Opaque identity of a lease holder.
///
/// The provider stores the holder identity alongside each lease and compares
/// it on renew and release, so a holder can only extend or drop its own lease.
/// Identities are unique per coordinator call, not per process: two concurrent
/// fill attempts in one process are still distinct holders.
///
/// # Examples
///
/// ```
/// use corral_store::HolderId;
///
/// let a = HolderId::generate();
/// let b = HolderId::generate();
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HolderId(Uuid);

impl HolderId {
    /// Generates a fresh, globally unique holder identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Contract for the distributed mutual-exclusion collaborator.
///
/// A lease is the time-bounded exclusive right to populate one key. The
/// provider enforces that at most one live lease exists per key at any
/// instant, and that leases expire on their own so a crashed holder self-heals
/// after at most the lease TTL.
///
/// # Failure semantics
///
/// Callers treat provider errors as `denied`/`lost`: the system fails toward
/// "someone else might be computing" rather than toward false exclusivity,
/// because false mutual exclusion can wedge the whole cache while false
/// concurrency only costs an extra computation.
pub trait LeaseProvider<K>: Send + Sync {
    /// Atomically acquires the lease for `key` if no live lease exists.
    ///
    /// Returns `true` when the lease was granted to `holder` for `ttl`.
    /// Exactly one concurrent caller across the whole fleet receives `true`
    /// for a given key while a lease is live.
    fn try_acquire(&self, key: &K, holder: &HolderId, ttl: Duration) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Extends a held lease to `ttl` from now.
    ///
    /// Returns `false` when the lease was lost: it expired, or another holder
    /// took it in the meantime.
    fn renew(&self, key: &K, holder: &HolderId, ttl: Duration) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Releases the lease if `holder` still owns it.
    ///
    /// Best-effort: skipping release is never fatal, the lease expires on its
    /// own. Releasing a lease owned by someone else is a no-op.
    fn release(&self, key: &K, holder: &HolderId) -> impl Future<Output = Result<(), Error>> + Send;
}
