// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Early refresh: reads past the soft expiry serve the stale value
//! immediately while one background fill refreshes the entry.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, Instant},
};

use corral::Coordinator;
use tick::Clock;

#[tokio::main]
async fn main() {
    let clock = Clock::new_tokio();
    let coordinator = Arc::new(
        Coordinator::builder::<String, String>(clock)
            .memory()
            .entry_ttl(Duration::from_secs(10))
            .refresh_after(Duration::from_secs(2))
            .build(),
    );

    let versions = Arc::new(AtomicU32::new(0));
    let key = "exchange_rates".to_string();

    let compute = |versions: Arc<AtomicU32>| {
        move || async move {
            let version = versions.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, std::io::Error>(format!("rates_v{version}"))
        }
    };

    // Initial fill pays the computation latency.
    let entry = coordinator
        .get_or_fill(&key, compute(Arc::clone(&versions)))
        .await
        .expect("initial fill");
    println!("t=0.0s  initial fill: {}", entry.value());

    // Reads past the soft expiry serve the old value with no latency.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let started = Instant::now();
    let entry = coordinator
        .get_or_fill(&key, compute(Arc::clone(&versions)))
        .await
        .expect("stale serve");
    println!("t=3.0s  stale serve: {} (took {:?})", entry.value(), started.elapsed());

    // Once the background fill lands, readers see the refreshed value.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let entry = coordinator
        .get_or_fill(&key, compute(Arc::clone(&versions)))
        .await
        .expect("refreshed read");
    println!("t=4.0s  refreshed:   {}", entry.value());
}
