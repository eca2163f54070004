use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;

use crate::classify::{partition_findings, ErrorDetector, Finding, ReportingMode};
use crate::runner::{CommandRunner, CommandSpec};

use super::types::{FailureReason, TaskOutcome, TaskState, TaskSummary};

pub const BUILD_LOG_FILE: &str = "build.log";
pub const BUILD_ERROR_LOG_FILE: &str = "build.error.log";

/// Common task interface for executor graph handling.
pub trait TaskLike {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &BTreeSet<String>;
    fn add_dependency(&mut self, id: String) -> bool;
}

/// Immutable description of one project's build, shared with the worker
/// that runs it.
#[derive(Debug)]
pub struct BuildJob {
    id: String,
    folder: PathBuf,
    commands: Vec<CommandSpec>,
    detector: Arc<ErrorDetector>,
    mode: ReportingMode,
    quiet: bool,
    write_logs: bool,
}

impl BuildJob {
    pub fn new(
        id: impl Into<String>,
        folder: impl AsRef<Path>,
        commands: Vec<CommandSpec>,
        detector: Arc<ErrorDetector>,
    ) -> Self {
        Self {
            id: id.into(),
            folder: folder.as_ref().to_path_buf(),
            commands,
            detector,
            mode: ReportingMode::default(),
            quiet: false,
            write_logs: false,
        }
    }

    pub fn with_mode(mut self, mode: ReportingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_logs(mut self, write_logs: bool) -> Self {
        self.write_logs = write_logs;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Runs the build commands in order, stopping at the first non-zero
    /// exit code, then classifies everything that was captured.
    ///
    /// Never fails: launch problems and bad exit codes are part of the
    /// returned outcome.
    pub async fn run(&self, runner: &dyn CommandRunner) -> TaskOutcome {
        let start = Instant::now();
        let mut outcome = TaskOutcome::default();
        if self.commands.is_empty() {
            outcome.exit_code = Some(0);
        }

        for spec in &self.commands {
            let mut spec = spec.clone();
            if !self.quiet {
                spec.echo_prefix = Some(self.id.clone());
            }
            tracing::debug!(task = %self.id, command = %spec.display(), "running build command");

            match runner.run(&spec).await {
                Ok(out) => {
                    append_output(&mut outcome.stdout, &out.stdout);
                    append_output(&mut outcome.stderr, &out.stderr);
                    outcome.exit_code = Some(out.exit_code);
                    if !out.success() {
                        tracing::debug!(
                            task = %self.id,
                            command = %spec.display(),
                            exit_code = out.exit_code,
                            "build command failed"
                        );
                        break;
                    }
                }
                Err(e) if e.is_launch_failure() => {
                    tracing::warn!(task = %self.id, "{}", e);
                    outcome.launch_error = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    tracing::warn!(task = %self.id, "{}", e);
                    outcome.abort_reason = Some(e.to_string());
                    break;
                }
            }
        }

        let lines = outcome.stdout.lines().chain(outcome.stderr.lines());
        let (errors, warnings) = partition_findings(self.detector.classify(lines, self.mode));
        outcome.errors = errors;
        outcome.warnings = warnings;
        outcome.duration_ms = start.elapsed().as_millis() as u64;

        if self.write_logs {
            self.write_log_files(&outcome).await;
        }

        outcome
    }

    async fn write_log_files(&self, outcome: &TaskOutcome) {
        let mut log = format!(
            "# {} build log ({})\n",
            self.id,
            Local::now().to_rfc3339()
        );
        for spec in &self.commands {
            log.push_str(&format!("# $ {}\n", spec.display()));
        }
        log.push_str(&outcome.stdout);
        if !outcome.stderr.is_empty() {
            log.push_str("\n# stderr\n");
            log.push_str(&outcome.stderr);
        }

        let log_path = self.folder.join(BUILD_LOG_FILE);
        if let Err(e) = tokio::fs::write(&log_path, log).await {
            tracing::warn!(
                task = %self.id,
                path = %log_path.display(),
                "failed to write build log: {}",
                e
            );
        }

        let error_path = self.folder.join(BUILD_ERROR_LOG_FILE);
        if outcome.errors.is_empty() {
            match tokio::fs::remove_file(&error_path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    tracing::warn!(
                        task = %self.id,
                        path = %error_path.display(),
                        "failed to remove stale error log: {}",
                        e
                    );
                }
                _ => {}
            }
            return;
        }

        let body = outcome
            .errors
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if let Err(e) = tokio::fs::write(&error_path, body + "\n").await {
            tracing::warn!(
                task = %self.id,
                path = %error_path.display(),
                "failed to write error log: {}",
                e
            );
        }
    }
}

fn append_output(buf: &mut String, chunk: &str) {
    if chunk.is_empty() {
        return;
    }
    if !buf.is_empty() && !buf.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str(chunk);
}

/// One project's build as tracked by the scheduler.
///
/// Only the scheduler mutates a task; the running worker holds just the
/// shared [`BuildJob`] and hands back a [`TaskOutcome`].
#[derive(Debug)]
pub struct BuildTask {
    id: String,
    dependency_ids: BTreeSet<String>,
    state: TaskState,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
    failure: Option<FailureReason>,
    duration_ms: u64,
    job: Arc<BuildJob>,
}

impl BuildTask {
    pub fn new(job: BuildJob) -> Self {
        Self {
            id: job.id.clone(),
            dependency_ids: BTreeSet::new(),
            state: TaskState::Pending,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            duration_ms: 0,
            job: Arc::new(job),
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn job(&self) -> Arc<BuildJob> {
        Arc::clone(&self.job)
    }

    pub(crate) fn set_state(&mut self, state: TaskState) {
        tracing::trace!(task = %self.id, from = ?self.state, to = ?state, "task state change");
        self.state = state;
    }

    /// Stores a finished run and moves to the matching terminal state.
    pub(crate) fn record(&mut self, outcome: TaskOutcome) -> TaskState {
        self.failure = outcome.failure();
        self.exit_code = outcome.exit_code;
        self.stdout = outcome.stdout;
        self.stderr = outcome.stderr;
        self.errors = outcome.errors;
        self.warnings = outcome.warnings;
        self.duration_ms = outcome.duration_ms;

        let state = if self.failure.is_some() {
            TaskState::Failed
        } else {
            TaskState::Succeeded
        };
        self.set_state(state);
        state
    }

    /// Fails the task without running it.
    pub(crate) fn mark_skipped(&mut self, root: &str) {
        self.failure = Some(FailureReason::DependencyFailed {
            root: root.to_string(),
        });
        self.set_state(TaskState::Failed);
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.id.clone(),
            state: self.state,
            failure: self.failure.clone(),
            exit_code: self.exit_code,
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

impl TaskLike for BuildTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependency_ids
    }

    fn add_dependency(&mut self, id: String) -> bool {
        self.dependency_ids.insert(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{DetectionRule, RegexRule, Severity};
    use crate::error::RunnerError;
    use crate::runner::CommandOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays scripted results, one per command.
    struct Scripted {
        results: Mutex<Vec<Result<CommandOutput, RunnerError>>>,
        seen: Mutex<Vec<CommandSpec>>,
    }

    impl Scripted {
        fn new(mut results: Vec<Result<CommandOutput, RunnerError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
            self.seen.lock().unwrap().push(spec.clone());
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(CommandOutput::default()))
        }
    }

    fn out(exit_code: i32, stdout: &str) -> Result<CommandOutput, RunnerError> {
        Ok(CommandOutput {
            exit_code,
            stdout: stdout.to_string(),
            ..CommandOutput::default()
        })
    }

    fn detector() -> Arc<ErrorDetector> {
        let rules: Vec<Arc<dyn DetectionRule>> = vec![
            Arc::new(RegexRule::new("err", r"^ERROR (?P<message>.*)", Severity::Error).unwrap()),
            Arc::new(RegexRule::new("warn", r"^WARN (?P<message>.*)", Severity::Warning).unwrap()),
        ];
        Arc::new(ErrorDetector::new(rules))
    }

    fn job(dir: &Path) -> BuildJob {
        let commands = vec![
            CommandSpec::new("npm", dir).args(["run", "clean"]),
            CommandSpec::new("npm", dir).args(["run", "test"]),
        ];
        BuildJob::new("app", dir, commands, detector())
    }

    #[tokio::test]
    async fn runs_every_command_and_classifies_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Scripted::new(vec![out(0, "cleaned"), out(0, "WARN slow\nERROR broken")]);

        let outcome = job(dir.path()).with_quiet(true).run(&runner).await;

        assert_eq!(runner.seen.lock().unwrap().len(), 2);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout, "cleaned\nWARN slow\nERROR broken");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.failure(), Some(FailureReason::ErrorsDetected(1)));
    }

    #[tokio::test]
    async fn stops_after_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Scripted::new(vec![out(3, ""), out(0, "")]);

        let outcome = job(dir.path()).run(&runner).await;

        assert_eq!(runner.seen.lock().unwrap().len(), 1);
        assert_eq!(outcome.failure(), Some(FailureReason::ExitCode(3)));
    }

    #[tokio::test]
    async fn launch_failure_is_an_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Scripted::new(vec![Err(RunnerError::Spawn {
            program: "npm".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })]);

        let outcome = job(dir.path()).run(&runner).await;

        assert!(matches!(
            outcome.failure(),
            Some(FailureReason::LaunchFailed(ref r)) if r.contains("npm")
        ));
    }

    #[tokio::test]
    async fn echo_prefix_follows_quiet_flag() {
        let dir = tempfile::tempdir().unwrap();

        let runner = Scripted::new(vec![]);
        job(dir.path()).run(&runner).await;
        assert!(runner
            .seen
            .lock()
            .unwrap()
            .iter()
            .all(|s| s.echo_prefix.as_deref() == Some("app")));

        let runner = Scripted::new(vec![]);
        job(dir.path()).with_quiet(true).run(&runner).await;
        assert!(runner.seen.lock().unwrap().iter().all(|s| s.echo_prefix.is_none()));
    }

    #[tokio::test]
    async fn writes_build_and_error_logs() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Scripted::new(vec![out(0, ""), out(0, "ERROR bad thing")]);

        job(dir.path()).with_logs(true).run(&runner).await;

        let log = std::fs::read_to_string(dir.path().join(BUILD_LOG_FILE)).unwrap();
        assert!(log.contains("# $ npm run test"));
        assert!(log.contains("ERROR bad thing"));
        let errors = std::fs::read_to_string(dir.path().join(BUILD_ERROR_LOG_FILE)).unwrap();
        assert_eq!(errors, "[err] error: bad thing\n");

        let runner = Scripted::new(vec![out(0, ""), out(0, "all good")]);
        job(dir.path()).with_logs(true).run(&runner).await;
        assert!(!dir.path().join(BUILD_ERROR_LOG_FILE).exists());
    }

    #[tokio::test]
    async fn unremovable_stale_error_log_leaves_outcome_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(BUILD_ERROR_LOG_FILE)).unwrap();
        let runner = Scripted::new(vec![out(0, ""), out(0, "all good")]);

        let outcome = job(dir.path()).with_logs(true).run(&runner).await;

        assert_eq!(outcome.failure(), None);
        assert!(dir.path().join(BUILD_ERROR_LOG_FILE).is_dir());
        assert!(dir.path().join(BUILD_LOG_FILE).is_file());
    }

    #[test]
    fn record_and_skip_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = BuildTask::new(job(dir.path()));
        assert_eq!(task.state(), TaskState::Pending);
        assert!(task.add_dependency("lib".to_string()));
        assert!(!task.add_dependency("lib".to_string()));

        let state = task.record(TaskOutcome {
            exit_code: Some(0),
            ..TaskOutcome::default()
        });
        assert_eq!(state, TaskState::Succeeded);

        let mut other = BuildTask::new(job(dir.path()));
        other.mark_skipped("lib");
        assert_eq!(other.state(), TaskState::Failed);
        assert!(other.failure().unwrap().is_skip());
        assert_eq!(other.exit_code(), None);
    }
}
