// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Integration tests for `CacheEntry` expiration semantics.

use std::time::{Duration, SystemTime};

use corral_store::CacheEntry;

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn fresh_entry_has_no_metadata() {
    let entry = CacheEntry::new("value");
    assert!(entry.cached_at().is_none());
    assert!(entry.ttl().is_none());
}

#[test]
fn ttl_boundary_is_inclusive() {
    let mut entry = CacheEntry::with_ttl(1, Duration::from_secs(10));
    entry.set_cached_at(at(100));

    // Exactly at the TTL the entry is still live; one second past it is not.
    assert!(!entry.is_expired_at(at(110)));
    assert!(entry.is_expired_at(at(111)));
}

#[test]
fn set_ttl_after_construction() {
    let mut entry = CacheEntry::new(7);
    entry.set_ttl(Duration::from_secs(30));
    entry.set_cached_at(at(0));

    assert_eq!(entry.ttl(), Some(Duration::from_secs(30)));
    assert!(entry.is_expired_at(at(31)));
}

#[test]
fn ensure_cached_at_stamps_only_once() {
    let mut entry = CacheEntry::new(7);
    entry.ensure_cached_at(at(5));
    entry.ensure_cached_at(at(50));

    assert_eq!(entry.cached_at(), Some(at(5)));
}

#[test]
fn age_is_none_before_stamping() {
    let entry = CacheEntry::new(7);
    assert!(entry.age(at(10)).is_none());
}

#[test]
fn entry_equality_includes_metadata() {
    let a = CacheEntry::with_ttl(1, Duration::from_secs(10));
    let mut b = CacheEntry::with_ttl(1, Duration::from_secs(10));
    assert_eq!(a, b);

    b.set_cached_at(at(1));
    assert_ne!(a, b);
}
