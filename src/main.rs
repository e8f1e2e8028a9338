//! rollplan - run task plans with rollback.
//!
//! Usage:
//!   rollplan run <plan.yaml>       Execute a plan
//!     --report <FILE>              Write task results as JSON
//!   rollplan validate <plan.yaml>  Validate a plan without running it
//!   rollplan show <plan.yaml>      Print the tasks of a plan

use clap::{Parser, Subcommand};
use rollplan::{
    Event, EventBus, EventHandler, ExecutorConfig, PlanConfig, TaskExecutor, YamlLoader,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// rollplan - a transactional task-execution engine
#[derive(Parser)]
#[command(name = "rollplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a plan
    Run {
        /// Path to the plan YAML file
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        /// Executor settings file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Report what would happen without doing it
        #[arg(long)]
        dry_run: bool,

        /// Undo applied file changes if any task fails
        #[arg(long)]
        rollback_on_failure: bool,

        /// Write the task results to this file as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Validate a plan without running it
    Validate {
        /// Path to the plan YAML file
        #[arg(value_name = "PLAN")]
        plan: PathBuf,
    },

    /// Print the tasks of a plan
    Show {
        /// Path to the plan YAML file
        #[arg(value_name = "PLAN")]
        plan: PathBuf,
    },
}

/// Logging event handler that prints plan progress.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::PlanStarted {
                task_count,
                dry_run,
                ..
            } => {
                let mode = if *dry_run { " (dry run)" } else { "" };
                info!("Plan started with {} task(s){}", task_count, mode);
            }
            Event::TaskCompleted {
                task_id,
                duration,
                output,
                ..
            } => {
                info!("  Task '{}' completed in {:?}", task_id, duration);
                for line in output.trim().lines() {
                    info!("    {}", line);
                }
            }
            Event::TaskFailed { task_id, error, .. } => {
                warn!("  Task '{}' failed", task_id);
                for line in error.trim().lines() {
                    warn!("    {}", line);
                }
            }
            Event::PlanCompleted {
                attempted,
                succeeded,
                halted,
                duration,
                ..
            } => {
                if *halted {
                    error!(
                        "Plan halted after {} task(s), {} succeeded ({:?})",
                        attempted, succeeded, duration
                    );
                } else {
                    info!(
                        "Plan finished: {}/{} task(s) succeeded ({:?})",
                        succeeded, attempted, duration
                    );
                }
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            plan,
            config,
            dry_run,
            rollback_on_failure,
            report,
        } => {
            run_plan(
                &plan,
                config.as_deref(),
                dry_run,
                rollback_on_failure,
                report.as_deref(),
            )
            .await?;
        }
        Commands::Validate { plan } => {
            validate_plan(&plan)?;
        }
        Commands::Show { plan } => {
            show_plan(&plan)?;
        }
    }

    Ok(())
}

/// Execute a plan file.
async fn run_plan(
    plan_path: &Path,
    config_path: Option<&Path>,
    dry_run: bool,
    rollback_on_failure: bool,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => YamlLoader::load_executor_config(path)?,
        None => ExecutorConfig::default(),
    };
    let plan = YamlLoader::load_plan_config(plan_path)?;
    info!("Loaded plan '{}' from {}", plan.name, plan_path.display());

    let ctx = plan.execution_context().with_dry_run(plan.dry_run || dry_run);
    let mut tasks = plan.into_tasks();

    let event_bus = Arc::new(EventBus::new());
    event_bus.register(Arc::new(LoggingHandler)).await;

    let mut executor = TaskExecutor::builder()
        .config(config)
        .event_bus(event_bus)
        .build();

    let results = executor.execute_tasks(&mut tasks, &ctx).await;
    let failed = results.len() < tasks.len() || results.iter().any(|r| !r.success);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&results)?;
        tokio::fs::write(path, json).await?;
        info!("Wrote results to {}", path.display());
    }

    if !failed {
        return Ok(());
    }

    if rollback_on_failure {
        let report = executor.rollback().await;
        if !report.is_complete() {
            for failure in &report.failed {
                error!("Could not undo '{}': {}", failure.action.description, failure.error);
            }
        }
    }

    Err("plan did not complete successfully".into())
}

/// Validate a plan file without running it.
fn validate_plan(plan_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating plan: {}", plan_path.display());

    match YamlLoader::load_plan_config(plan_path) {
        Ok(plan) => {
            info!("Plan '{}' is valid: {} task(s)", plan.name, plan.tasks.len());
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Print the tasks of a plan.
fn show_plan(plan_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let plan: PlanConfig = YamlLoader::load_plan_config(plan_path)?;

    println!("Plan: {}", plan.name);
    if let Some(description) = &plan.description {
        println!("  {}", description);
    }
    println!("  Working directory: {}", plan.working_directory.display());
    println!("  Dry run: {}", plan.dry_run);
    println!();

    for (index, task) in plan.into_tasks().iter().enumerate() {
        println!(
            "{:>3}. [{}] {} ({})",
            index + 1,
            task.kind.type_name(),
            task.description,
            task.id
        );
        if !task.metadata.dependencies.is_empty() {
            let deps: Vec<&str> = task.metadata.dependencies.iter().map(|d| d.as_str()).collect();
            println!("       depends on: {}", deps.join(", "));
        }
        if task.metadata.retryable {
            match task.metadata.max_retries {
                Some(n) => println!("       retryable: up to {} retries", n),
                None => println!("       retryable: default retries"),
            }
        }
    }

    Ok(())
}
