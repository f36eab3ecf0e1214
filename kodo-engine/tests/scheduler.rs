mod common;

use common::*;

use kodo_engine::{EngineError, ExecutionRequest, JobState, Scheduler};
use kodo_protocol::common::{ExecutionStatus, Mode, TestCase};
use kodo_protocol::error::ErrorCode;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tempfile::TempDir;

fn setup(workers: usize, queue_depth: usize, queue_timeout: u64) -> (TempDir, PathBuf, Scheduler) {
    init();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ws");
    let mut config = config(&root);
    config.executor.run_timeout = 30000;
    config.scheduler.workers = workers;
    config.scheduler.queue_depth = queue_depth;
    config.scheduler.queue_timeout = queue_timeout;
    let scheduler = Scheduler::new(config).unwrap();
    (dir, root, scheduler)
}

fn sleeper(id: &str, secs: u32) -> ExecutionRequest {
    ExecutionRequest::new("shell", format!("sleep {}; echo done", secs))
        .with_id(id)
        .with_cases(Mode::Submit, vec![TestCase::new("", "done")])
}

#[tokio::test(flavor = "multi_thread")]
async fn full_queue_rejects_immediately() {
    let (_dir, _root, scheduler) = setup(1, 1, 30000);

    let first = scheduler.submit(sleeper("first", 1)).unwrap();
    wait_until("first job runs", || {
        scheduler.state("first") == Some(JobState::Running)
    })
    .await;

    let second = scheduler.submit(sleeper("second", 0)).unwrap();
    assert_eq!(scheduler.state("second"), Some(JobState::Queued));
    assert_eq!(scheduler.stats().queued, 1);

    match scheduler.submit(sleeper("third", 0)) {
        Err(err @ EngineError::CapacityExceeded { .. }) => {
            assert_eq!(err.status(), ExecutionStatus::InternalError);
            assert_eq!(err.code(), ErrorCode::CapacityExceeded);
        }
        other => panic!("unexpected: {:?}", other.map(|h| h.request_id().to_owned())),
    }
    assert_eq!(scheduler.state("third"), None);

    assert_eq!(first.wait().await.status, Some(ExecutionStatus::Accepted));
    assert_eq!(second.wait().await.status, Some(ExecutionStatus::Accepted));

    let stats = scheduler.stats();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.queued + stats.compiling + stats.running, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_handle_cancels_a_running_job() {
    let (_dir, root, scheduler) = setup(1, 4, 30000);

    let handle = scheduler.submit(sleeper("doomed", 30)).unwrap();
    wait_until("job runs", || scheduler.state("doomed") == Some(JobState::Running)).await;

    drop(handle);
    wait_until("job is aborted", || scheduler.stats().aborted == 1).await;
    assert_eq!(scheduler.state("doomed"), None);
    assert_eq!(leftovers(&root), 0);

    // the worker is free again
    let result = scheduler.execute(sleeper("next", 0)).await;
    assert_eq!(result.status, Some(ExecutionStatus::Accepted));
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_handle_cancels_a_queued_job() {
    let (_dir, root, scheduler) = setup(1, 4, 30000);

    let first = scheduler.submit(sleeper("first", 1)).unwrap();
    let queued = scheduler.submit(sleeper("queued", 0)).unwrap();
    drop(queued);

    assert_eq!(first.wait().await.status, Some(ExecutionStatus::Accepted));
    wait_until("queued job is aborted", || scheduler.stats().aborted == 1).await;
    assert_eq!(scheduler.stats().completed, 1);
    assert_eq!(leftovers(&root), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn in_flight_ids_are_unique() {
    let (_dir, _root, scheduler) = setup(1, 4, 30000);

    let handle = scheduler.submit(sleeper("dup", 0)).unwrap();
    let err = scheduler.submit(sleeper("dup", 0)).err().unwrap();
    assert!(matches!(err, EngineError::DuplicateRequest(_)));
    assert_eq!(err.status(), ExecutionStatus::InvalidInput);

    assert_eq!(handle.wait().await.status, Some(ExecutionStatus::Accepted));
    let result = scheduler.execute(sleeper("dup", 0)).await;
    assert_eq!(result.status, Some(ExecutionStatus::Accepted));
}

#[tokio::test(flavor = "multi_thread")]
async fn queued_jobs_expire_at_the_deadline() {
    let (_dir, root, scheduler) = setup(1, 4, 200);

    let first = scheduler.submit(sleeper("slow", 3)).unwrap();
    wait_until("first job runs", || scheduler.state("slow") == Some(JobState::Running)).await;

    let t0 = Instant::now();
    let result = scheduler.submit(sleeper("stale", 0)).unwrap().wait().await;
    let waited = t0.elapsed();

    assert_eq!(result.status, Some(ExecutionStatus::InternalError));
    assert_eq!(result.code, Some(ErrorCode::QueueTimeout));
    assert!(result.test_results.is_empty());
    assert!(waited < Duration::from_millis(1500), "waited = {:?}", waited);
    assert_eq!(scheduler.state("stale"), None);
    assert_eq!(scheduler.stats().aborted, 1);

    assert_eq!(first.wait().await.status, Some(ExecutionStatus::Accepted));
    let stats = scheduler.stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.queued + stats.compiling + stats.running, 0);
    assert_eq!(leftovers(&root), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unwaited_stale_jobs_expire_when_picked_up() {
    let (_dir, _root, scheduler) = setup(1, 4, 200);

    let first = scheduler.submit(sleeper("slow", 1)).unwrap();
    let second = scheduler.submit(sleeper("stale", 0)).unwrap();

    // nobody waits on the second handle until the worker is free again
    assert_eq!(first.wait().await.status, Some(ExecutionStatus::Accepted));
    let result = second.wait().await;
    assert_eq!(result.status, Some(ExecutionStatus::InternalError));
    assert_eq!(result.code, Some(ErrorCode::QueueTimeout));
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_drains_and_closes() {
    let (_dir, root, scheduler) = setup(2, 4, 30000);

    let handles: Vec<_> = (0..3)
        .map(|i| scheduler.submit(sleeper(&format!("job-{}", i), 0)).unwrap())
        .collect();

    scheduler.shutdown().await;

    for handle in handles {
        assert_eq!(handle.wait().await.status, Some(ExecutionStatus::Accepted));
    }
    assert!(matches!(
        scheduler.submit(sleeper("late", 0)),
        Err(EngineError::ShuttingDown)
    ));
    assert_eq!(leftovers(&root), 0);
}
