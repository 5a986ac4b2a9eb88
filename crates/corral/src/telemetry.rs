// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Activity recording for coordinator operations.
//!
//! With the `logs` feature enabled, activities are emitted as `tracing`
//! events; otherwise recording compiles to nothing.

use std::time::Duration;

/// What happened during a coordinator operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FillActivity {
    /// The canonical entry was present and fresh.
    Hit,
    /// The canonical entry was present but past its soft expiry; it was
    /// served while a background refresh was triggered.
    StaleServed,
    /// This caller won the lease and committed a freshly computed value.
    Filled,
    /// This caller won the lease but the computation failed.
    FillFailed,
    /// A waiter adopted a value committed by a concurrent filler.
    Coalesced,
    /// A waiter's deadline elapsed and it computed the value without a lease.
    EscapeComputed,
    /// A waiter's deadline elapsed and the call failed per policy.
    DeadlineFailed,
    /// A lease renewal reported the lease lost mid-computation.
    LeaseLost,
    /// A background refresh was spawned for a soft-expired entry.
    RefreshSpawned,
    /// A committed value could not be written to a collaborator.
    CommitSkipped,
}

impl FillActivity {
    #[cfg(feature = "logs")]
    fn is_degraded(self) -> bool {
        matches!(
            self,
            Self::FillFailed | Self::EscapeComputed | Self::DeadlineFailed | Self::LeaseLost | Self::CommitSkipped
        )
    }
}

/// Records a coordinator activity with the elapsed time of the operation so
/// far.
#[cfg(feature = "logs")]
pub(crate) fn record(name: &str, activity: FillActivity, elapsed: Duration) {
    if activity.is_degraded() {
        tracing::warn!(coordinator = name, activity = ?activity, elapsed = ?elapsed, "cache fill activity");
    } else {
        tracing::debug!(coordinator = name, activity = ?activity, elapsed = ?elapsed, "cache fill activity");
    }
}

#[cfg(not(feature = "logs"))]
pub(crate) fn record(_name: &str, _activity: FillActivity, _elapsed: Duration) {}
