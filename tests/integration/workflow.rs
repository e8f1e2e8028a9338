//! Ordered execution tests.
//!
//! Tests that verify ordering, dependency gating and halting across a batch.

use rollplan::{DEPENDENCIES_NOT_MET, Event, LineChange, Task, TaskId, TaskStatus, ValidationType};

use crate::common::{Fixture, context};

#[tokio::test]
async fn test_results_follow_input_order() {
    let mut fx = Fixture::new().await;
    fx.runner.push_exit(0, "v20.0.0", "");
    let mut tasks = vec![
        Task::file_create("create", "a.txt", "hello"),
        Task::command_run("node", "node", ["--version"]),
        Task::ai_query("ask", "summarize a.txt"),
        Task::file_modify("edit", "a.txt", vec![LineChange::insert(None, "bye")]),
        Task::validation("build", ValidationType::Build, None),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(results.len(), tasks.len());
    let outputs: Vec<&str> = results.iter().map(|r| r.output.as_deref().unwrap()).collect();
    assert_eq!(
        outputs,
        vec![
            "Created file: a.txt",
            "v20.0.0",
            "ok",
            "Modified file: a.txt",
            "Build succeeded",
        ]
    );
    assert!(tasks.iter().all(|t| t.status() == TaskStatus::Completed));
    assert_eq!(fx.fs.contents(fx.path("a.txt")).as_deref(), Some("hello\nbye"));
}

#[tokio::test]
async fn test_unmet_dependency_skips_without_calling_handler() {
    let mut fx = Fixture::new().await;
    fx.runner.push_exit(1, "", "boom");
    let mut tasks = vec![
        Task::command_run("setup", "npm", ["install"]).retryable(0),
        Task::command_run("test", "npm", ["test"]).depends_on("setup"),
        Task::ai_query("independent", "still runs?"),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(results.len(), 3);
    assert!(!results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].error.as_deref(), Some(DEPENDENCIES_NOT_MET));
    assert!(results[1].is_skipped());
    assert!(results[2].success);

    // Only the failing setup reached the runner.
    assert_eq!(fx.runner.call_count(), 1);
    assert_eq!(tasks[1].status(), TaskStatus::Pending);
    assert!(!fx.executor.history().contains_key(&TaskId::new("test")));
}

#[tokio::test]
async fn test_dependency_on_unknown_id_is_unmet() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![Task::ai_query("ask", "?").depends_on("never-ran")];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert!(results[0].is_skipped());
    assert!(fx.ai.queries().is_empty());
}

#[tokio::test]
async fn test_dependencies_satisfied_by_earlier_batch() {
    let mut fx = Fixture::new().await;
    let mut first = vec![Task::file_create("create", "a.txt", "x")];
    fx.executor.execute_tasks(&mut first, &context()).await;

    let mut second = vec![Task::file_delete("remove", "a.txt").depends_on("create")];
    let results = fx.executor.execute_tasks(&mut second, &context()).await;

    assert!(results[0].success);
    assert!(!fx.fs.has(fx.path("a.txt")));
}

#[tokio::test]
async fn test_non_retryable_failure_halts_batch() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![
        Task::file_create("ok", "a.txt", "1"),
        Task::file_delete("missing", "ghost.txt"),
        Task::command_run("never", "npm", ["publish"]),
        Task::ai_query("never-either", "?"),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(fx.runner.call_count(), 0);
    assert!(fx.ai.queries().is_empty());
    assert_eq!(tasks[2].status(), TaskStatus::Pending);
    assert_eq!(tasks[3].status(), TaskStatus::Pending);
}

#[tokio::test]
async fn test_disallowed_command_halts_before_spawning() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![
        Task::command_run("inject", "git", ["log", "|", "sh"]),
        Task::command_run("after", "git", ["status"]),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].error.as_deref().unwrap().contains("forbidden sequence '|'"));
    assert_eq!(fx.runner.call_count(), 0);
}

#[tokio::test]
async fn test_lifecycle_events_for_halted_plan() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![
        Task::ai_query("gated", "?").depends_on("nothing"),
        Task::file_delete("fails", "ghost.txt"),
        Task::ai_query("unreached", "?"),
    ];

    fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert_eq!(
        fx.events.names().await,
        vec![
            "plan_started",
            "task_skipped",
            "task_started",
            "task_failed",
            "plan_halted",
            "plan_completed",
        ]
    );

    let events = fx.events.events().await;
    match events.last() {
        Some(Event::PlanCompleted {
            attempted,
            succeeded,
            halted,
            ..
        }) => {
            assert_eq!(*attempted, 2);
            assert_eq!(*succeeded, 0);
            assert!(*halted);
        }
        other => panic!("Expected PlanCompleted, got {:?}", other),
    }
}
