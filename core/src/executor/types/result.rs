use crate::classify::Finding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Registered, graph not yet analysed.
    Pending,
    /// Waiting on at least one unresolved dependency.
    Blocked,
    /// All dependencies succeeded, waiting for a free slot.
    Ready,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Why a task ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A build command exited with a non-zero code.
    ExitCode(i32),
    /// Exit code was zero but the output contained errors.
    ErrorsDetected(usize),
    /// A build command could not be started.
    LaunchFailed(String),
    /// Not run because `root` (a transitive dependency) failed.
    DependencyFailed { root: String },
    /// The build future panicked or could not be awaited.
    Aborted(String),
}

impl FailureReason {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::DependencyFailed { .. })
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "exited with code {}", code),
            Self::ErrorsDetected(n) => write!(f, "{} error(s) detected in output", n),
            Self::LaunchFailed(reason) => write!(f, "could not launch build: {}", reason),
            Self::DependencyFailed { root } => write!(f, "skipped, dependency '{}' failed", root),
            Self::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// What a build task hands back to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct TaskOutcome {
    /// `None` when no command ran to completion.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub launch_error: Option<String>,
    pub abort_reason: Option<String>,
    pub duration_ms: u64,
}

impl TaskOutcome {
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            abort_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// A task succeeds iff every command exited with zero and no
    /// error-severity finding was detected. Warnings never fail a task.
    pub fn failure(&self) -> Option<FailureReason> {
        if let Some(reason) = &self.launch_error {
            return Some(FailureReason::LaunchFailed(reason.clone()));
        }
        if let Some(reason) = &self.abort_reason {
            return Some(FailureReason::Aborted(reason.clone()));
        }
        match self.exit_code {
            Some(0) => {}
            Some(code) => return Some(FailureReason::ExitCode(code)),
            None => return Some(FailureReason::Aborted("no exit code".to_string())),
        }
        if !self.errors.is_empty() {
            return Some(FailureReason::ErrorsDetected(self.errors.len()));
        }
        None
    }
}

/// Final per-task record surfaced to the command layer.
#[derive(Debug, Clone)]
pub struct TaskSummary {
    pub task_id: String,
    pub state: TaskState,
    pub failure: Option<FailureReason>,
    pub exit_code: Option<i32>,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub duration_ms: u64,
}

/// Result of executing a task graph
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub run_id: String,

    pub total_tasks: usize,

    pub succeeded: usize,

    /// Tasks that ran (or tried to) and failed.
    pub failed: usize,

    /// Tasks marked failed without running because a dependency failed.
    pub skipped: usize,

    pub duration_ms: u64,

    /// Per-task results, in registration order.
    pub tasks: Vec<TaskSummary>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.succeeded == self.total_tasks
    }

    pub fn task(&self, id: &str) -> Option<&TaskSummary> {
        self.tasks.iter().find(|t| t.task_id == id)
    }

    /// Ids of tasks that failed on their own (root causes).
    pub fn failed_ids(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| matches!(&t.failure, Some(r) if !r.is_skip()))
            .map(|t| t.task_id.as_str())
            .collect()
    }

    pub fn skipped_ids(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| matches!(&t.failure, Some(r) if r.is_skip()))
            .map(|t| t.task_id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Severity;

    fn finding(severity: Severity) -> Finding {
        Finding {
            severity,
            source_line: 1,
            rule: "test".to_string(),
            location: None,
            code: None,
            message: "x".to_string(),
        }
    }

    #[test]
    fn zero_exit_without_errors_succeeds_even_with_warnings() {
        let outcome = TaskOutcome {
            exit_code: Some(0),
            warnings: vec![finding(Severity::Warning)],
            ..TaskOutcome::default()
        };
        assert_eq!(outcome.failure(), None);
    }

    #[test]
    fn zero_exit_with_errors_fails() {
        let outcome = TaskOutcome {
            exit_code: Some(0),
            errors: vec![finding(Severity::Error)],
            ..TaskOutcome::default()
        };
        assert_eq!(outcome.failure(), Some(FailureReason::ErrorsDetected(1)));
    }

    #[test]
    fn non_zero_exit_fails_regardless_of_findings() {
        let outcome = TaskOutcome {
            exit_code: Some(2),
            ..TaskOutcome::default()
        };
        assert_eq!(outcome.failure(), Some(FailureReason::ExitCode(2)));
    }

    #[test]
    fn launch_failure_takes_precedence() {
        let outcome = TaskOutcome {
            launch_error: Some("No such file or directory".to_string()),
            ..TaskOutcome::default()
        };
        assert!(matches!(
            outcome.failure(),
            Some(FailureReason::LaunchFailed(_))
        ));
    }
}
