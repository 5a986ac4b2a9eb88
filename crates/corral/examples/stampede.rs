// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Five concurrent callers race on a cold key; the coordinator elects one
//! filler and coalesces the rest onto its result.

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
            .fill_ttl(Duration::from_secs(5))
            .entry_ttl(Duration::from_secs(60))
            .wait_deadline(Duration::from_secs(3))
            .poll_interval(Duration::from_millis(25))
            .build(),
    );

    let computations = Arc::new(AtomicU32::new(0));
    let key = "expensive_report".to_string();
    let started = Instant::now();

    let mut handles = Vec::new();
    for caller in 0..5 {
        let coordinator = Arc::clone(&coordinator);
        let computations = Arc::clone(&computations);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            let entry = coordinator
                .get_or_fill(&key, move || async move {
                    computations.fetch_add(1, Ordering::SeqCst);
                    // Stand-in for a slow database query or API call.
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok::<_, std::io::Error>("rendered report".to_string())
                })
                .await
                .expect("fill succeeded");
            println!("caller {caller}: {} ({:?})", entry.value(), started.elapsed());
        }));
    }

    for handle in handles {
        handle.await.expect("task panicked");
    }

    println!("computations: {} (5 callers)", computations.load(Ordering::SeqCst));
}
