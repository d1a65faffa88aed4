//! Integration tests for core-async on the Tokio runtime.

use core_async::sync::{broadcast, mpsc, oneshot, watch};
use core_async::task::{self, TaskGuard};
use core_async::time::{self, Duration, Instant};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn test_task_guard_aborts_on_drop() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let guard = TaskGuard::new(task::spawn(async move {
        loop {
            time::sleep(Duration::from_millis(10)).await;
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }
    }));

    time::sleep(Duration::from_millis(35)).await;
    drop(guard);
    let observed = counter.load(Ordering::SeqCst);

    time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), observed);
}

#[tokio::test]
async fn test_task_guard_join() {
    let mut guard = TaskGuard::new(task::spawn(async { "done" }));
    assert_eq!(guard.join().await.unwrap(), "done");
    assert!(guard.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_ticker_skips_missed_ticks() {
    let mut ticks = time::ticker(Duration::from_millis(200));
    ticks.tick().await;

    // Simulate a slow iteration spanning several periods.
    time::sleep(Duration::from_millis(700)).await;
    let before = Instant::now();
    ticks.tick().await;
    ticks.tick().await;

    // The second tick after the stall waits a full period instead of firing
    // immediately as a burst.
    assert!(before.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_failure() {
    let result = time::timeout(Duration::from_millis(10), async {
        time::sleep(Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_unbounded_channel_preserves_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    for i in 0..5 {
        tx.send(i).unwrap();
    }
    drop(tx);

    let mut seen = Vec::new();
    while let Some(value) = rx.recv().await {
        seen.push(value);
    }
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_oneshot_reply() {
    let (tx, rx) = oneshot::channel();
    task::spawn(async move {
        tx.send("ok").unwrap();
    });
    assert_eq!(rx.await.unwrap(), "ok");
}

#[tokio::test]
async fn test_watch_snapshot() {
    let (tx, rx) = watch::channel(0usize);
    tx.send_replace(3);
    assert_eq!(*rx.borrow(), 3);
}

#[tokio::test]
async fn test_broadcast_fan_out() {
    let (tx, mut a) = broadcast::channel(4);
    let mut b = tx.subscribe();
    tx.send(1u8).unwrap();
    assert_eq!(a.recv().await.unwrap(), 1);
    assert_eq!(b.recv().await.unwrap(), 1);
}

#[test]
fn test_block_on() {
    let value = core_async::runtime::block_on(async { 5 }).unwrap();
    assert_eq!(value, 5);
}

#[tokio::test(start_paused = true)]
async fn select_prefers_the_first_ready_branch() {
    let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
    tx.send(7).unwrap();

    let deadline = time::sleep(Duration::from_secs(1));
    core_async::pin!(deadline);

    let got = core_async::select! {
        Some(value) = rx.recv() => Some(value),
        _ = &mut deadline => None,
    };
    assert_eq!(got, Some(7));

    let timed_out = core_async::select! {
        Some(value) = rx.recv() => Some(value),
        _ = &mut deadline => None,
    };
    assert_eq!(timed_out, None);
}
