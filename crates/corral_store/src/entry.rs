// Copyright (c) The Corral Project Authors.

use std::{
    ops::Deref,
    time::{Duration, SystemTime},
};

/// A cached value with expiration metadata.
///
/// `CacheEntry` wraps a value with an optional TTL and the time it was written.
/// Stores use this metadata to decide whether an entry is still live: an entry
/// whose age exceeds its TTL is equivalent to absent.
///
/// # Examples
///
/// ```
/// use corral_store::CacheEntry;
/// use std::time::Duration;
///
/// // Simple entry with just a value
/// let entry = CacheEntry::new(42);
/// assert_eq!(*entry.value(), 42);
///
/// // Entry with a TTL
/// let entry = CacheEntry::with_ttl("data".to_string(), Duration::from_secs(60));
/// assert_eq!(entry.ttl(), Some(Duration::from_secs(60)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    cached_at: Option<SystemTime>,
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    /// Creates a new cache entry with the given value and no TTL.
    ///
    /// The timestamp is stamped by the store when the entry is inserted.
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: None,
        }
    }

    /// Creates a new cache entry with a TTL.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral_store::CacheEntry;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::with_ttl(42, Duration::from_secs(300));
    /// assert_eq!(entry.ttl(), Some(Duration::from_secs(300)));
    /// ```
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: Some(ttl),
        }
    }

    /// Returns the time this entry was written, if stamped.
    #[must_use]
    pub fn cached_at(&self) -> Option<SystemTime> {
        self.cached_at
    }

    /// Sets the write timestamp.
    ///
    /// This is typically called by the store implementation when inserting.
    pub fn set_cached_at(&mut self, cached_at: SystemTime) {
        self.cached_at = Some(cached_at);
    }

    /// Stamps the write timestamp if it has not been set yet.
    ///
    /// Entries recreated from persistent storage keep their original timestamp.
    pub fn ensure_cached_at(&mut self, cached_at: SystemTime) {
        if self.cached_at.is_none() {
            self.cached_at = Some(cached_at);
        }
    }

    /// Returns the entry's TTL, if set.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Sets the entry's TTL.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = Some(ttl);
    }

    /// Returns the entry's age at `now`.
    ///
    /// Returns `None` when the entry has never been stamped or when `now`
    /// precedes the write timestamp (the system clock moved backwards).
    #[must_use]
    pub fn age(&self, now: SystemTime) -> Option<Duration> {
        self.cached_at.and_then(|cached_at| now.duration_since(cached_at).ok())
    }

    /// Returns `true` if the entry is past its TTL at `now`.
    ///
    /// An entry without a TTL never expires. An entry with a TTL but no write
    /// timestamp is treated as expired, as is one whose timestamp lies in the
    /// future (clock moved backwards).
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        match self.ttl {
            Some(ttl) => self.age(now).is_none_or(|age| age > ttl),
            None => false,
        }
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<V> From<V> for CacheEntry<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_without_ttl_never_expires() {
        let entry = CacheEntry::new(1);
        assert!(!entry.is_expired_at(SystemTime::UNIX_EPOCH + Duration::from_secs(u32::MAX.into())));
    }

    #[test]
    fn entry_with_ttl_but_no_timestamp_is_expired() {
        let entry = CacheEntry::with_ttl(1, Duration::from_secs(60));
        assert!(entry.is_expired_at(SystemTime::UNIX_EPOCH));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut entry = CacheEntry::with_ttl(1, Duration::from_secs(60));
        entry.set_cached_at(start);

        assert!(!entry.is_expired_at(start + Duration::from_secs(60)));
        assert!(entry.is_expired_at(start + Duration::from_secs(61)));
    }

    #[test]
    fn entry_with_future_timestamp_is_expired() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut entry = CacheEntry::with_ttl(1, Duration::from_secs(60));
        entry.set_cached_at(start);

        // Clock moved backwards past the write timestamp.
        assert!(entry.is_expired_at(start - Duration::from_secs(1)));
    }

    #[test]
    fn ensure_cached_at_keeps_existing_timestamp() {
        let original = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let mut entry = CacheEntry::new(1);
        entry.set_cached_at(original);
        entry.ensure_cached_at(original + Duration::from_secs(5));

        assert_eq!(entry.cached_at(), Some(original));
    }

    #[test]
    fn age_measures_from_write_timestamp() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let mut entry = CacheEntry::new(1);
        assert_eq!(entry.age(start), None);

        entry.set_cached_at(start);
        assert_eq!(entry.age(start + Duration::from_secs(7)), Some(Duration::from_secs(7)));
    }

    #[test]
    fn deref_and_from_expose_value() {
        let entry: CacheEntry<String> = "hello".to_string().into();
        assert_eq!(entry.len(), 5);
        assert_eq!(entry.into_value(), "hello");
    }
}
