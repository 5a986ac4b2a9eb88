// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Fill behavior configuration.

use std::time::Duration;

/// What a waiter does when its wait deadline elapses and the lease is still
/// denied.
///
/// Either way the waiter first re-attempts to acquire the lease; this policy
/// only governs the final fallback when the lease remains held elsewhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeadlinePolicy {
    /// Compute the value without a lease, accepting a possible duplicate
    /// computation rather than blocking indefinitely. This is the default:
    /// it bounds worst-case latency at the cost of occasionally violating
    /// the at-most-once guarantee under provider failure.
    #[default]
    SelfCompute,
    /// Fail the call with a deadline error and let the caller decide.
    Fail,
}

/// Configuration for fill operations.
///
/// A coordinator carries one `FillConfig` as its default; individual calls
/// can override it via
/// [`get_or_fill_with`](crate::Coordinator::get_or_fill_with).
///
/// # TTL sizing
///
/// `fill_ttl` bounds how long a crashed filler suppresses other fillers: size
/// it to the worst-case computation time plus margin. Undersizing lets a
/// second filler start while the first is still computing (duplicate work,
/// safe but wasteful); oversizing delays recovery from a crashed filler.
/// `wait_deadline` is independent of `fill_ttl` and typically shorter.
///
/// # Examples
///
/// ```
/// use corral::{DeadlinePolicy, FillConfig};
/// use std::time::Duration;
///
/// let config = FillConfig::new()
///     .with_fill_ttl(Duration::from_secs(5))
///     .with_entry_ttl(Duration::from_secs(60))
///     .with_wait_deadline(Duration::from_secs(3))
///     .with_poll_interval(Duration::from_millis(50))
///     .with_deadline_policy(DeadlinePolicy::Fail);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillConfig {
    /// Lease TTL for fillers: the self-healing bound. A crashed filler
    /// blocks other fillers for at most this long.
    pub fill_ttl: Duration,
    /// TTL of committed canonical entries.
    pub entry_ttl: Duration,
    /// How long a waiter polls for a coalesced result before falling back
    /// per [`DeadlinePolicy`]. Measured from the waiter's own start,
    /// independent of the filler's lease TTL.
    pub wait_deadline: Duration,
    /// Waiter polling interval. Each sleep is lengthened by a bounded random
    /// jitter (up to half the interval) to avoid synchronized polling
    /// bursts.
    pub poll_interval: Duration,
    /// TTL of the result slot used to hand freshly computed values to
    /// coalesced waiters. `None` means `fill_ttl`, so a slot always outlives
    /// the deadlines of waiters coalesced behind a live filler. Keep this at
    /// or below `entry_ttl`: the slot is a hand-off, not a second cache.
    pub slot_ttl: Option<Duration>,
    /// Soft expiry for early refresh: an entry older than this (but not yet
    /// expired) is served immediately while a background fill is triggered.
    /// `None` disables early refresh. Requires the `tokio` feature; without
    /// a runtime the setting is inert.
    pub refresh_after: Option<Duration>,
    /// Policy applied when a waiter's deadline elapses.
    pub on_deadline: DeadlinePolicy,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            fill_ttl: Duration::from_secs(30),
            entry_ttl: Duration::from_secs(300),
            wait_deadline: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            slot_ttl: None,
            refresh_after: None,
            on_deadline: DeadlinePolicy::default(),
        }
    }
}

impl FillConfig {
    /// Creates a configuration with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configuration with the given filler lease TTL.
    #[must_use]
    pub fn with_fill_ttl(mut self, ttl: Duration) -> Self {
        self.fill_ttl = ttl;
        self
    }

    /// Returns the configuration with the given canonical entry TTL.
    #[must_use]
    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Returns the configuration with the given waiter deadline.
    #[must_use]
    pub fn with_wait_deadline(mut self, deadline: Duration) -> Self {
        self.wait_deadline = deadline;
        self
    }

    /// Returns the configuration with the given waiter polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the configuration with the given result-slot TTL.
    #[must_use]
    pub fn with_slot_ttl(mut self, ttl: Duration) -> Self {
        self.slot_ttl = Some(ttl);
        self
    }

    /// Returns the configuration with early refresh enabled at the given
    /// soft expiry.
    #[must_use]
    pub fn with_refresh_after(mut self, soft_expiry: Duration) -> Self {
        self.refresh_after = Some(soft_expiry);
        self
    }

    /// Returns the configuration with the given deadline policy.
    #[must_use]
    pub fn with_deadline_policy(mut self, policy: DeadlinePolicy) -> Self {
        self.on_deadline = policy;
        self
    }

    /// Returns the effective result-slot TTL.
    #[must_use]
    pub fn effective_slot_ttl(&self) -> Duration {
        self.slot_ttl.unwrap_or(self.fill_ttl)
    }
}
