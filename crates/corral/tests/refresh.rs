// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Integration tests for early refresh (soft expiry).

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, Instant},
};

use corral::Coordinator;
use tick::Clock;

fn counting_compute(
    calls: &Arc<AtomicU32>,
) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<String, std::io::Error>> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(format!("v{attempt}"))
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stale_read_serves_immediately_and_refreshes_in_background() {
    // Scaled-down version of the softExpiry=5s / entryTTL=10s scenario:
    // soft expiry 500ms, hard TTL 3s.
    let coordinator = Arc::new(
        Coordinator::builder::<String, String>(Clock::new_tokio())
            .memory()
            .entry_ttl(Duration::from_secs(3))
            .refresh_after(Duration::from_millis(500))
            .fill_ttl(Duration::from_secs(5))
            .build(),
    );
    let calls = Arc::new(AtomicU32::new(0));
    let key = "k".to_string();

    // t=0: initial fill.
    let entry = coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();
    assert_eq!(*entry.value(), "v1");

    // Past the soft expiry but inside the hard TTL.
    tokio::time::sleep(Duration::from_millis(700)).await;

    // The stale read returns the old value without paying the 300ms compute
    // latency.
    let started = Instant::now();
    let entry = coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();
    let latency = started.elapsed();
    assert_eq!(*entry.value(), "v1", "stale value is served, not recomputed inline");
    assert!(latency < Duration::from_millis(150), "serve must not block on refresh: {latency:?}");

    // The background fill lands; a later read sees the refreshed value.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let entry = coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();
    assert_eq!(*entry.value(), "v2");
    assert_eq!(calls.load(Ordering::SeqCst), 2, "one initial fill, one refresh");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stale_reads_trigger_exactly_one_refresh() {
    let coordinator = Arc::new(
        Coordinator::builder::<String, String>(Clock::new_tokio())
            .memory()
            .entry_ttl(Duration::from_secs(5))
            .refresh_after(Duration::from_millis(200))
            .build(),
    );
    let calls = Arc::new(AtomicU32::new(0));
    let key = "k".to_string();

    coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // A burst of stale reads: all serve immediately, and the in-flight set
    // plus the lease elect a single background refresher.
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let key = key.clone();
            let compute = counting_compute(&calls);
            tokio::spawn(async move { coordinator.get_or_fill(&key, compute).await })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        let entry = handle.expect("task").expect("stale serve succeeds");
        assert_eq!(*entry.value(), "v1");
    }

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2, "exactly one background refresh ran");

    let entry = coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();
    assert_eq!(*entry.value(), "v2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fresh_reads_do_not_refresh() {
    let coordinator = Coordinator::builder::<String, String>(Clock::new_tokio())
        .memory()
        .entry_ttl(Duration::from_secs(5))
        .refresh_after(Duration::from_secs(2))
        .build();
    let calls = Arc::new(AtomicU32::new(0));
    let key = "k".to_string();

    coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();
    let entry = coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();

    assert_eq!(*entry.value(), "v1");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "fresh entries spawn no refresh");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_refresh_leaves_stale_entry_serveable() {
    let coordinator = Coordinator::builder::<String, String>(Clock::new_tokio())
        .memory()
        .entry_ttl(Duration::from_secs(5))
        .refresh_after(Duration::from_millis(100))
        .build();
    let calls = Arc::new(AtomicU32::new(0));
    let key = "k".to_string();

    coordinator.get_or_fill(&key, counting_compute(&calls)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // The refresh computation fails in the background; the caller is
    // unaffected.
    let entry = coordinator
        .get_or_fill(&key, || {
            Box::pin(async { Err::<String, _>(std::io::Error::other("refresh backend down")) })
        })
        .await
        .expect("stale serve unaffected by refresh failure");
    assert_eq!(*entry.value(), "v1");

    tokio::time::sleep(Duration::from_millis(100)).await;

    // Still serveable, still v1.
    let entry = coordinator.get(&key).await.unwrap().expect("entry still live");
    assert_eq!(*entry.value(), "v1");
}
