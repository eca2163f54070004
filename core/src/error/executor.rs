use thiserror::Error;

/// Configuration errors for task graph construction. All of them are
/// raised before any task runs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        task_id: String,
        missing_dep: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),
}

