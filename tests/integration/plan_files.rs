//! Plan file tests.
//!
//! Tests that load plans from YAML and run them against a real directory.

use rollplan::{ExecutorConfig, TaskExecutor, YamlLoader};
use std::time::Duration;

const PLAN: &str = r#"
name: scaffold
description: Create and tweak a notes file
working_directory: workspace
environment:
  GREETING: hi
tasks:
  - id: create
    type: file-create
    file_path: notes.txt
    content: "first\nsecond"
  - id: edit
    type: file-modify
    file_path: notes.txt
    depends_on: [create]
    changes:
      - type: replace
        line: 1
        content: SECOND
      - type: insert
        content: third
  - id: copy
    type: command-run
    command: cp
    args: [notes.txt, copy.txt]
    depends_on: [edit]
"#;

#[tokio::test]
async fn test_plan_file_runs_in_its_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path().join("workspace");
    std::fs::create_dir(&workspace).unwrap();
    let plan_path = dir.path().join("plan.yaml");
    std::fs::write(&plan_path, PLAN).unwrap();

    let plan = YamlLoader::load_plan_config(&plan_path).unwrap();
    let ctx = plan.execution_context();
    let mut tasks = plan.into_tasks();
    let mut executor = TaskExecutor::new();

    let results = executor.execute_tasks(&mut tasks, &ctx).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.success), "{:?}", results);
    assert_eq!(
        std::fs::read_to_string(workspace.join("notes.txt")).unwrap(),
        "first\nSECOND\nthird"
    );
    assert_eq!(
        std::fs::read_to_string(workspace.join("copy.txt")).unwrap(),
        "first\nSECOND\nthird"
    );

    // The copy is a command effect and survives rollback; the notes file does not.
    let report = executor.rollback().await;
    assert!(report.is_complete());
    assert!(!workspace.join("notes.txt").exists());
    assert!(workspace.join("copy.txt").exists());
}

#[tokio::test]
async fn test_executor_config_from_file_drives_policy_and_retries() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("rollplan.yaml");
    std::fs::write(
        &config_path,
        "allowed_commands: [sh]\nretry_base_delay_ms: 5\ndefault_max_retries: 1\n",
    )
    .unwrap();
    let plan = YamlLoader::parse_plan_config(
        r#"
name: policy
tasks:
  - id: blocked
    type: command-run
    command: cp
    args: [a, b]
    retryable: true
  - id: allowed
    type: command-run
    command: sh
    args: ["-c", "exit 0"]
"#,
    )
    .unwrap();
    let config: ExecutorConfig = YamlLoader::load_executor_config(&config_path).unwrap();
    assert_eq!(config.retry_base_delay(), Duration::from_millis(5));

    let mut executor = TaskExecutor::builder().config(config).build();
    let mut ctx = plan.execution_context();
    ctx.working_directory = dir.path().to_path_buf();
    let mut tasks = plan.into_tasks();

    let results = executor.execute_tasks(&mut tasks, &ctx).await;

    assert_eq!(results.len(), 2);
    assert!(results[0].error.as_deref().unwrap().contains("'cp' is not allowed"));
    assert!(results[1].success);
}
