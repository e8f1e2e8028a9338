//! Rollback tests.
//!
//! Tests that verify undo order, partial failure and the interaction with
//! steps that register no undo.

use rollplan::testing::FsOperation;
use rollplan::{
    ExecutionContext, LineChange, RollbackOperation, Task, TaskExecutor, TaskStatus,
};
use std::path::PathBuf;

use crate::common::{Fixture, context};

#[tokio::test]
async fn test_rollback_is_lifo_step_by_step() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![
        Task::file_create("a", "x.txt", "hello"),
        Task::file_modify("b", "x.txt", vec![LineChange::replace(0, "world")]),
    ];
    fx.executor.execute_tasks(&mut tasks, &context()).await;
    assert_eq!(fx.fs.contents(fx.path("x.txt")).as_deref(), Some("world"));

    let pending = fx.executor.rollback_stack().to_vec();
    assert_eq!(pending.len(), 2);
    assert_eq!(
        pending[1].operation,
        RollbackOperation::RestoreFile {
            path: PathBuf::from(fx.path("x.txt")),
            content: "hello".into()
        }
    );

    let before = fx.fs.operation_count();
    let report = fx.executor.rollback().await;

    // Replay the undo log: the restore ran first and left the post-A content,
    // then the delete removed the file.
    let undo_ops: Vec<FsOperation> = fx.fs.operations()[before..].to_vec();
    assert_eq!(
        undo_ops,
        vec![
            FsOperation::Write(PathBuf::from(fx.path("x.txt"))),
            FsOperation::Remove(PathBuf::from(fx.path("x.txt"))),
        ]
    );
    assert_eq!(report.undone[0].task_id.as_str(), "b");
    assert_eq!(report.undone[1].task_id.as_str(), "a");
    assert!(!fx.fs.has(fx.path("x.txt")));
}

#[tokio::test]
async fn test_intermediate_state_after_first_undo() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![
        Task::file_create("a", "x.txt", "hello"),
        Task::file_modify("b", "x.txt", vec![LineChange::replace(0, "world")]),
    ];
    fx.executor.execute_tasks(&mut tasks, &context()).await;

    // A failing delete keeps the state left by the first undo observable.
    fx.fs.fail_removals_of(fx.path("x.txt"));
    let report = fx.executor.rollback().await;

    assert_eq!(report.undone.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(fx.fs.contents(fx.path("x.txt")).as_deref(), Some("hello"));
    assert!(fx.executor.rollback_stack().is_empty());
}

#[tokio::test]
async fn test_file_delete_undo_recreates_content() {
    let mut fx = Fixture::new().await;
    fx.fs.insert(fx.path("config.json"), "{\"a\":1}");
    let mut tasks = vec![Task::file_delete("rm", "config.json")];

    fx.executor.execute_tasks(&mut tasks, &context()).await;
    assert!(!fx.fs.has(fx.path("config.json")));

    let report = fx.executor.rollback().await;

    assert!(report.is_complete());
    assert_eq!(fx.fs.contents(fx.path("config.json")).as_deref(), Some("{\"a\":1}"));
}

#[tokio::test]
async fn test_failed_and_skipped_steps_register_nothing() {
    let mut fx = Fixture::new().await;
    fx.fs.insert(fx.path("exists.txt"), "old");
    let mut tasks = vec![
        Task::file_create("dup", "exists.txt", "new").retryable(0),
        Task::file_modify("gated", "exists.txt", vec![]).depends_on("dup"),
        Task::command_run("cmd", "npm", ["test"]),
        Task::ai_query("ask", "?"),
    ];

    fx.executor.execute_tasks(&mut tasks, &context()).await;

    assert!(fx.executor.rollback_stack().is_empty());
    let report = fx.executor.rollback().await;
    assert_eq!(report.attempted(), 0);
    assert_eq!(fx.fs.contents(fx.path("exists.txt")).as_deref(), Some("old"));
}

#[tokio::test]
async fn test_rollback_leaves_task_state_and_history() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![Task::file_create("a", "x.txt", "1")];
    fx.executor.execute_tasks(&mut tasks, &context()).await;

    fx.executor.rollback().await;

    assert_eq!(tasks[0].status(), TaskStatus::Completed);
    assert!(fx.executor.history()[&tasks[0].id].success);
}

#[tokio::test]
async fn test_rollback_events() {
    let mut fx = Fixture::new().await;
    let mut tasks = vec![
        Task::file_create("a", "a.txt", "1"),
        Task::file_create("b", "b.txt", "2"),
    ];
    fx.executor.execute_tasks(&mut tasks, &context()).await;
    fx.fs.fail_removals_of(fx.path("b.txt"));

    fx.executor.rollback().await;

    let names = fx.events.names().await;
    let tail: Vec<&str> = names[names.len() - 4..].to_vec();
    assert_eq!(
        tail,
        vec![
            "rollback_started",
            "rollback_failed",
            "action_rolled_back",
            "rollback_completed"
        ]
    );
}

/// Create, modify, then remove the file with a real `rm` process. Command
/// steps register no undo, so rollback restores "hello" over the missing
/// file and then deletes it: the file ends up absent.
#[tokio::test]
async fn test_command_removal_is_not_undone_on_real_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ExecutionContext::new(dir.path());
    let file = dir.path().join("a.txt");
    let mut executor = TaskExecutor::new();
    let mut tasks = vec![
        Task::file_create("create", "a.txt", "hello"),
        Task::file_modify("modify", "a.txt", vec![LineChange::replace(0, "world")]),
        Task::command_run("remove", "rm", ["a.txt"]),
    ];

    let r0 = executor.execute_task(&mut tasks[0], &ctx).await;
    assert!(r0.success);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "hello");

    let r1 = executor.execute_task(&mut tasks[1], &ctx).await;
    assert!(r1.success);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "world");

    let r2 = executor.execute_task(&mut tasks[2], &ctx).await;
    assert!(r2.success, "{:?}", r2.error);
    assert!(!file.exists());

    assert_eq!(executor.rollback_stack().len(), 2);
    let report = executor.rollback().await;

    assert!(report.is_complete());
    assert_eq!(report.undone.len(), 2);
    assert!(!file.exists());
}
