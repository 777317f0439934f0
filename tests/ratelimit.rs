//! Rate Limiter Integration Tests
//!
//! Pacing of named limiters shared through a registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mediarr::RateLimiterRegistry;

#[tokio::test]
async fn test_limiter_paces_takes() {
    let registry = RateLimiterRegistry::new();
    let limiter = registry.acquire("pacing", 10);

    let start = Instant::now();
    for _ in 0..21 {
        limiter.take().await;
    }

    // First take is free, the next 20 are spaced 100ms apart
    assert!(
        start.elapsed() >= Duration::from_millis(1900),
        "21 takes at 10/s finished in {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_limiter_is_shared_across_tasks() {
    let registry = Arc::new(RateLimiterRegistry::new());

    let start = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..3 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            // Same name from every task, whatever rate they ask for
            let limiter = registry.acquire("Shared", 20);
            for _ in 0..7 {
                limiter.take().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // 21 takes in total at 20/s
    assert!(start.elapsed() >= Duration::from_millis(950));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_distinct_names_do_not_share_budget() {
    let registry = RateLimiterRegistry::new();
    let first = registry.acquire("first", 1);
    let second = registry.acquire("second", 1);

    let start = Instant::now();
    first.take().await;
    second.take().await;

    assert!(start.elapsed() < Duration::from_millis(500));
}
