//! Core data model: tasks, results, contexts and rollback records.

pub mod context;
pub mod environment;
pub mod result;
pub mod retry;
pub mod rollback;
pub mod task;
pub mod types;
