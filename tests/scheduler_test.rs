//! Single-flight scheduler tests: concurrency ceiling and FIFO admission.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use xhscrape::error::ScrapeError;
use xhscrape::scheduler::ScrapeScheduler;

#[tokio::test]
async fn jobs_run_serialized_in_submission_order() {
    let scheduler = Arc::new(ScrapeScheduler::new(1));
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let completion_order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..3usize {
        let scheduler = Arc::clone(&scheduler);
        let active = Arc::clone(&active);
        let max_active = Arc::clone(&max_active);
        let completion_order = Arc::clone(&completion_order);

        handles.push(tokio::spawn(async move {
            scheduler
                .run(move || async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    completion_order.lock().await.push(i);
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<usize, ScrapeError>(i)
                })
                .await
        }));

        // Let job i reach the semaphore before submitting job i+1 so the
        // FIFO queue order is deterministic.
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.expect("task should not panic");
        assert_eq!(result.expect("job should succeed"), i);
    }

    assert_eq!(
        max_active.load(Ordering::SeqCst),
        1,
        "exactly one job may hold the browser slot at any instant"
    );
    assert_eq!(*completion_order.lock().await, vec![0, 1, 2]);
}

#[tokio::test]
async fn permits_are_released_when_jobs_fail() {
    let scheduler = ScrapeScheduler::new(1);

    let err = scheduler
        .run(|| async { Err::<(), _>(ScrapeError::Scrape("boom".into())) })
        .await
        .expect_err("job failure should propagate");
    assert!(matches!(err, ScrapeError::Scrape(_)));

    // Slot must be free again for the next job.
    assert_eq!(scheduler.available(), 1);
    let value = scheduler.run(|| async { Ok(42) }).await.unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn zero_concurrency_is_clamped_to_one() {
    let scheduler = ScrapeScheduler::new(0);
    assert_eq!(scheduler.concurrency(), 1);
    let value = scheduler.run(|| async { Ok("ran") }).await.unwrap();
    assert_eq!(value, "ran");
}
