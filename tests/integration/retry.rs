//! Retry behavior tests.
//!
//! Tests that verify retry bounds, early stop and linear backoff.

use rollplan::{Event, Task, TaskStatus};
use std::time::{Duration, Instant};

use crate::common::{Fixture, context};

#[tokio::test]
async fn test_always_failing_task_runs_exactly_one_plus_n_times() {
    let mut fx = Fixture::new().await;
    for attempt in 1..=3 {
        fx.runner.push_exit(1, "", &format!("attempt {attempt} failed"));
    }
    fx.runner.fail_all(1, "should not be reached");
    let mut tasks = vec![Task::command_run("flaky", "npm", ["test"]).retryable(2)];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(fx.runner.call_count(), 3);
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].error.as_deref(),
        Some("Command failed with code 1: attempt 3 failed")
    );
    assert_eq!(tasks[0].status(), TaskStatus::Failed);
    assert_eq!(tasks[0].result(), Some(&results[0]));
}

#[tokio::test]
async fn test_retry_stops_at_first_success() {
    let mut fx = Fixture::new().await;
    fx.runner.push_exit(1, "", "flake");
    fx.runner.push_exit(0, "green", "");
    let mut tasks = vec![
        Task::command_run("flaky", "npm", ["test"]).retryable(5),
        Task::ai_query("next", "?"),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(fx.runner.call_count(), 2);
    assert!(results[0].success);
    assert_eq!(results[0].output.as_deref(), Some("green"));
    assert!(results[1].success);
    assert_eq!(tasks[0].status(), TaskStatus::Completed);
}

#[tokio::test]
async fn test_exhausted_retries_continue_with_next_task() {
    let mut fx = Fixture::new().await;
    fx.runner.fail_all(2, "still broken");
    let mut tasks = vec![
        Task::command_run("flaky", "cargo", ["test"]).retryable(1),
        Task::file_create("after", "after.txt", "ran"),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(results.len(), 2);
    assert!(!results[0].success);
    assert!(results[1].success);
    assert!(fx.fs.has(fx.path("after.txt")));
}

#[tokio::test]
async fn test_backoff_grows_linearly() {
    let base = Duration::from_millis(20);
    let mut fx = Fixture::with_retry_delay(base).await;
    fx.runner.fail_all(1, "nope");
    let mut tasks = vec![Task::command_run("flaky", "npm", ["test"]).retryable(3)];

    let start = Instant::now();
    fx.executor.execute_tasks(&mut tasks, &context()).await;
    let elapsed = start.elapsed();

    let delays: Vec<(u32, Duration)> = fx
        .events
        .events()
        .await
        .into_iter()
        .filter_map(|e| match e {
            Event::TaskRetrying { retry, delay, .. } => Some((retry, delay)),
            _ => None,
        })
        .collect();

    assert_eq!(
        delays,
        vec![(1, base), (2, base * 2), (3, base * 3)]
    );
    assert!(elapsed >= base * 6, "elapsed {:?}", elapsed);
    assert_eq!(fx.runner.call_count(), 4);
}

#[tokio::test]
async fn test_retry_replaces_history_entry() {
    let mut fx = Fixture::new().await;
    fx.runner.push_exit(1, "", "first");
    fx.runner.push_exit(0, "second", "");
    let mut tasks = vec![Task::command_run("flaky", "npm", ["ci"]).retryable(1)];

    fx.executor.execute_tasks(&mut tasks, &context()).await;

    let history = fx.executor.history();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[&tasks[0].id].output.as_deref(),
        Some("second")
    );
}

#[tokio::test]
async fn test_rerunning_completed_retryable_batch_does_not_back_off() {
    let base = Duration::from_millis(50);
    let mut fx = Fixture::with_retry_delay(base).await;
    fx.runner.push_exit(0, "done", "");
    fx.runner.fail_all(1, "should not be reached");
    let mut tasks = vec![Task::command_run("x", "npm", ["test"]).retryable(3)];

    let first = fx.executor.execute_tasks(&mut tasks, &context()).await;
    let start = Instant::now();
    let second = fx.executor.execute_tasks(&mut tasks, &context()).await;
    let elapsed = start.elapsed();

    assert_eq!(second, first);
    assert!(second[0].success);
    assert!(elapsed < base, "elapsed {:?}", elapsed);
    assert_eq!(fx.runner.call_count(), 1);
    assert!(
        !fx.events
            .names()
            .await
            .contains(&"task_retrying")
    );
    assert_eq!(fx.executor.history()[&tasks[0].id], second[0]);
}

#[tokio::test]
async fn test_same_task_executed_twice_keeps_latest_in_history() {
    let mut fx = Fixture::new().await;
    fx.runner.push_exit(0, "first", "");
    let mut task = Task::command_run("same", "npm", ["ci"]);

    fx.executor.execute_task(&mut task, &context()).await;
    let latest = fx.executor.execute_task(&mut task, &context()).await;

    let history = fx.executor.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[&task.id], latest);
    assert_eq!(latest.output.as_deref(), Some("first"));
    assert_eq!(fx.runner.call_count(), 1);
}

#[tokio::test]
async fn test_retryable_task_skipped_for_dependencies_is_never_retried() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![
        Task::command_run("gated", "npm", ["test"])
            .retryable(3)
            .depends_on("missing"),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].is_skipped());
    assert_eq!(fx.runner.call_count(), 0);
    assert_eq!(tasks[0].status(), TaskStatus::Pending);
    assert_eq!(
        fx.events.names().await,
        vec!["plan_started", "task_skipped", "plan_completed"]
    );
}
