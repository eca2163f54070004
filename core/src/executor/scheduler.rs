use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::runner::CommandRunner;

use super::graph::{IndexedGraph, TaskGraph};
use super::output::{
    emit_execution_plan, emit_run_end, emit_run_start, emit_task_complete, emit_task_skipped,
    emit_task_start,
};
use super::progress::ProgressMonitor;
use super::task::{BuildTask, TaskLike};
use super::types::{ExecutionOpts, ExecutionReport, TaskOutcome, TaskState};

/// Runs every registered [`BuildTask`] once, honouring dependencies and a
/// bound on how many builds run at the same time.
///
/// The scheduler is populated (`add_task`, then `add_dependencies`) and
/// consumed by [`TaskScheduler::execute`]; it cannot be reused.
pub struct TaskScheduler {
    graph: TaskGraph<BuildTask>,
    runner: Arc<dyn CommandRunner>,
    opts: ExecutionOpts,
}

impl TaskScheduler {
    pub fn new(runner: Arc<dyn CommandRunner>, opts: ExecutionOpts) -> Self {
        Self {
            graph: TaskGraph::new(),
            runner,
            opts,
        }
    }

    pub fn opts(&self) -> &ExecutionOpts {
        &self.opts
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&BuildTask> {
        self.graph.get(id)
    }

    pub fn add_task(&mut self, task: BuildTask) -> Result<(), SchedulerError> {
        tracing::debug!(task = %task.id(), "registering task");
        self.graph.add_node(task)
    }

    pub fn add_dependencies<I, S>(
        &mut self,
        id: &str,
        dependency_ids: I,
    ) -> Result<(), SchedulerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.graph.add_edges(id, dependency_ids)
    }

    /// Runs the whole graph to completion.
    ///
    /// Returns `Err` only for configuration problems found before any task
    /// starts. Build failures are reported through the returned
    /// [`ExecutionReport`].
    pub async fn execute(self) -> Result<ExecutionReport, SchedulerError> {
        self.graph.validate()?;
        let plan = self.graph.topological_sort()?;

        let Self {
            graph,
            runner,
            opts,
        } = self;
        let IndexedGraph {
            mut tasks,
            dependents,
        } = graph.into_indexed();

        let run_id = Uuid::new_v4().to_string();
        let limit = opts.concurrency_limit.max(1);
        let start = Instant::now();

        tracing::info!(run_id = %run_id, tasks = tasks.len(), limit, "starting build run");

        let mut progress = ProgressMonitor::new(tasks.len(), opts.progress_bar && !opts.quiet);
        progress.emit(|out| {
            emit_run_start(out, &opts, tasks.len())?;
            emit_execution_plan(out, &opts, &plan)
        });

        let mut unresolved: Vec<usize> = tasks.iter().map(|t| t.dependencies().len()).collect();
        let mut ready: BTreeSet<usize> = BTreeSet::new();
        for (idx, task) in tasks.iter_mut().enumerate() {
            if unresolved[idx] == 0 {
                task.set_state(TaskState::Ready);
                ready.insert(idx);
            } else {
                task.set_state(TaskState::Blocked);
            }
        }

        let mut running = FuturesUnordered::new();

        loop {
            // Lowest index first: among ready tasks, registration order wins.
            while running.len() < limit {
                let Some(idx) = ready.pop_first() else {
                    break;
                };
                let task = &mut tasks[idx];
                task.set_state(TaskState::Running);
                progress.emit(|out| emit_task_start(out, &opts, task));
                progress.start_task(task.id());

                let job = task.job();
                let runner = Arc::clone(&runner);
                let handle = tokio::spawn(async move { job.run(runner.as_ref()).await });
                running.push(async move { (idx, handle.await) });
            }

            let Some((idx, joined)) = running.next().await else {
                break;
            };

            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(task = %tasks[idx].id(), "build task aborted: {}", e);
                    TaskOutcome::aborted(e.to_string())
                }
            };

            let state = tasks[idx].record(outcome);
            progress.emit(|out| emit_task_complete(out, &opts, &tasks[idx]));
            progress.complete_task(tasks[idx].id(), state == TaskState::Succeeded);

            if state == TaskState::Succeeded {
                for &dependent in &dependents[idx] {
                    unresolved[dependent] = unresolved[dependent].saturating_sub(1);
                    let blocked = tasks[dependent].state() == TaskState::Blocked;
                    if unresolved[dependent] == 0 && blocked {
                        tasks[dependent].set_state(TaskState::Ready);
                        ready.insert(dependent);
                    }
                }
            } else {
                skip_dependents(&mut tasks, &dependents, idx, &opts, &mut progress);
            }
        }

        let total_tasks = tasks.len();
        let succeeded = tasks
            .iter()
            .filter(|t| t.state() == TaskState::Succeeded)
            .count();
        let skipped = tasks
            .iter()
            .filter(|t| t.failure().is_some_and(|r| r.is_skip()))
            .count();

        let report = ExecutionReport {
            run_id,
            total_tasks,
            succeeded,
            failed: total_tasks - succeeded - skipped,
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
            tasks: tasks.iter().map(BuildTask::summary).collect(),
        };

        progress.finish(report.is_success());
        tracing::info!(
            run_id = %report.run_id,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            "build run finished"
        );
        progress.emit(|out| emit_run_end(out, &report));

        Ok(report)
    }
}

/// Fails every transitive dependent of `root` that has not run.
fn skip_dependents(
    tasks: &mut [BuildTask],
    dependents: &[Vec<usize>],
    root: usize,
    opts: &ExecutionOpts,
    progress: &mut ProgressMonitor,
) {
    let root_id = tasks[root].id().to_string();
    let mut queue: VecDeque<usize> = dependents[root].iter().copied().collect();

    while let Some(idx) = queue.pop_front() {
        if tasks[idx].state().is_terminal() {
            continue;
        }
        tasks[idx].mark_skipped(&root_id);
        tracing::debug!(
            task = %tasks[idx].id(),
            root = %root_id,
            "skipping dependent of failed task"
        );
        progress.emit(|out| emit_task_skipped(out, opts, &tasks[idx]));
        progress.complete_task(tasks[idx].id(), false);
        queue.extend(dependents[idx].iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorDetector;
    use crate::error::RunnerError;
    use crate::executor::task::BuildJob;
    use crate::runner::{CommandOutput, CommandSpec};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts invocations; every command succeeds.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandRunner for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self, _spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CommandOutput::default())
        }
    }

    fn task(id: &str) -> BuildTask {
        let folder = format!("/virtual/{id}");
        let cmd = CommandSpec::new("build", &folder);
        let detector = Arc::new(ErrorDetector::default());
        BuildTask::new(BuildJob::new(id, &folder, vec![cmd], detector).with_quiet(true))
    }

    fn scheduler(runner: Arc<Counting>, ids: &[&str]) -> TaskScheduler {
        let mut s = TaskScheduler::new(runner, ExecutionOpts::default().quiet(true));
        for id in ids {
            s.add_task(task(id)).unwrap();
        }
        s
    }

    #[test]
    fn duplicate_task_is_a_configuration_error() {
        let mut s = scheduler(Arc::new(Counting::default()), &["a"]);
        assert_eq!(
            s.add_task(task("a")),
            Err(SchedulerError::DuplicateTaskId("a".to_string()))
        );
    }

    #[test]
    fn unknown_ids_in_add_dependencies() {
        let mut s = scheduler(Arc::new(Counting::default()), &["a", "b"]);
        assert_eq!(
            s.add_dependencies("nope", ["a"]),
            Err(SchedulerError::TaskNotFound("nope".to_string()))
        );
        assert!(matches!(
            s.add_dependencies("b", ["ghost"]),
            Err(SchedulerError::DependencyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn cycle_fails_before_running_anything() {
        let runner = Arc::new(Counting::default());
        let mut s = scheduler(runner.clone(), &["a", "b", "c"]);
        s.add_dependencies("a", ["b"]).unwrap();
        s.add_dependencies("b", ["a"]).unwrap();

        let err = s.execute().await.unwrap_err();
        assert_eq!(err, SchedulerError::CircularDependency("a -> b -> a".to_string()));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_graph_succeeds() {
        let s = scheduler(Arc::new(Counting::default()), &[]);
        let report = s.execute().await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.total_tasks, 0);
    }

    #[tokio::test]
    async fn states_before_and_after_execution() {
        let runner = Arc::new(Counting::default());
        let mut s = scheduler(runner.clone(), &["lib", "app"]);
        s.add_dependencies("app", ["lib"]).unwrap();
        assert_eq!(s.task("app").unwrap().state(), TaskState::Pending);

        let report = s.execute().await.unwrap();
        assert!(report.is_success());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
        assert!(report
            .tasks
            .iter()
            .all(|t| t.state == TaskState::Succeeded));
    }
}
