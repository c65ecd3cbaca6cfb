//! Concurrency tests: many producers, one cycle driver, cooperative shutdown.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use groupmatch::{
    ChannelNotifier, ExitRecord, Group, GroupMatchConfig, IngestError, JoinRequest, LogNotifier,
    Scheduler, Weights,
};
use tokio::sync::watch;

fn config(capacity: usize, timeout: u32) -> GroupMatchConfig {
    let mut cfg = GroupMatchConfig::default();
    cfg.ingest.queue_capacity = capacity;
    cfg.scheduler.timeout_threshold = timeout;
    cfg.scheduler.tick_interval_ms = 1_000;
    cfg
}

fn request(thread: usize, n: usize) -> JoinRequest {
    JoinRequest::new(
        format!("t{thread}-u{n}"),
        [1, 2, 3][n % 3],
        [2, 3, 4][thread % 3],
        [["tree", "math", "graph"][n % 3]],
    )
}

#[test]
fn producers_on_many_threads_never_lose_or_duplicate() {
    let (tx, mut sched) = Scheduler::with_queue(config(1_000, 6)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let tx = tx.clone();
            thread::spawn(move || {
                for n in 0..25 {
                    tx.try_submit(request(t, n)).expect("queue has room");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut exits: Vec<ExitRecord> = Vec::new();
    for _ in 0..10 {
        exits.extend(sched.tick().exits);
    }
    assert!(sched.pool().is_empty());

    let mut seen = HashSet::new();
    for member in exits.iter().flat_map(|r| r.members.iter()) {
        assert!(seen.insert(member.clone()), "{member} exited twice");
    }
    assert_eq!(seen.len(), 200);
}

#[test]
fn overflow_on_one_thread_does_not_affect_others() {
    let (tx, mut sched) = Scheduler::with_queue(config(16, 6)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let tx = tx.clone();
            thread::spawn(move || {
                let mut overflowed = 0;
                for n in 0..10 {
                    match tx.try_submit(request(t, n)) {
                        Ok(()) => {}
                        Err(IngestError::QueueOverflow { capacity }) => {
                            assert_eq!(capacity, 16);
                            overflowed += 1;
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                overflowed
            })
        })
        .collect();
    let overflowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(overflowed, 40 - 16);
    assert_eq!(sched.tick().admitted, 16);
}

#[tokio::test(start_paused = true)]
async fn run_loop_drains_pool_after_senders_drop() {
    let (tx, sched) = Scheduler::with_queue(config(100, 4)).unwrap();
    let (notifier, mut exits) = ChannelNotifier::new();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    for n in 0..20 {
        tx.submit(request(n % 2, n)).await.unwrap();
    }
    drop(tx);

    let status = tokio::spawn(sched.run(Arc::new(notifier), shutdown_rx))
        .await
        .unwrap();

    let mut members = HashSet::new();
    while let Ok(record) = exits.try_recv() {
        for member in record.members {
            assert!(members.insert(member));
        }
    }
    assert_eq!(members.len(), 20);
    assert_eq!(status.pool_groups, 0);
    assert_eq!(status.waiting_members, 0);
    assert!(status.ticks <= 5, "pool should drain within the timeout");
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_stops_between_ticks() {
    let (tx, sched) = Scheduler::with_queue(config(100, 12)).unwrap();
    let mut status = sched.status();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tx.try_submit(JoinRequest::new("a", 1, 2, ["tree"])).unwrap();
    let handle = tokio::spawn(sched.run(Arc::new(LogNotifier), shutdown_rx));

    status.changed().await.unwrap();
    assert_eq!(status.borrow().ticks, 1);

    shutdown_tx.send(true).unwrap();
    let last = handle.await.unwrap();
    assert_eq!(last.ticks, 1);
    assert_eq!(last.waiting_members, 1);
}

#[tokio::test(start_paused = true)]
async fn submit_waits_for_room_then_overflows() {
    let (tx, _sched) = Scheduler::with_queue(config(1, 12)).unwrap();
    tx.try_submit(JoinRequest::new("a", 1, 2, ["tree"])).unwrap();

    let err = tx
        .submit_timeout(
            JoinRequest::new("b", 1, 2, ["tree"]),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    assert_eq!(err, IngestError::QueueOverflow { capacity: 1 });
    assert!(err.is_retryable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_cycles_keep_ticking_without_sleeping() {
    let mut cfg = config(100, 1_000);
    cfg.scheduler.tick_interval_ms = 1;
    let (tx, sched) = Scheduler::with_queue(cfg).unwrap();
    // every pair score takes longer than the whole interval
    let sched = sched.with_penalty(|_: &Group, _: &Group, _: &Weights| {
        thread::sleep(Duration::from_millis(3));
        1.0
    });
    let mut status = sched.status();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tx.try_submit(JoinRequest::new("a", 1, 2, ["string", "array"]))
        .unwrap();
    tx.try_submit(JoinRequest::new("b", 3, 4, ["tree", "recursion"]))
        .unwrap();
    let handle = tokio::spawn(sched.run(Arc::new(LogNotifier), shutdown_rx));

    while status.borrow().ticks < 5 {
        status.changed().await.unwrap();
    }

    shutdown_tx.send(true).unwrap();
    let last = handle.await.unwrap();
    assert!(last.ticks >= 5);
    assert_eq!(last.waiting_members, 2);
    drop(tx);
}
