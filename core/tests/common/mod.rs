#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stackbuild_core::classify::{DetectionRule, ErrorDetector, RegexRule, Severity};
use stackbuild_core::executor::{BuildJob, BuildTask, ExecutionOpts, TaskScheduler};
use stackbuild_core::runner::{CommandOutput, CommandRunner, CommandSpec};
use stackbuild_core::RunnerError;

#[derive(Debug, Clone)]
pub enum Behaviour {
    Exit { code: i32, stdout: String },
    LaunchFailure,
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    End(String),
}

/// Fake build runner keyed by the last component of the command's cwd.
pub struct MockRunner {
    behaviours: Mutex<HashMap<String, Behaviour>>,
    events: Mutex<Vec<Event>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            behaviours: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn set(&self, id: &str, behaviour: Behaviour) {
        self.behaviours
            .lock()
            .unwrap()
            .insert(id.to_string(), behaviour);
    }

    pub fn fail(&self, id: &str) {
        self.set(
            id,
            Behaviour::Exit {
                code: 1,
                stdout: String::new(),
            },
        );
    }

    pub fn output(&self, id: &str, stdout: &str) {
        self.set(
            id,
            Behaviour::Exit {
                code: 0,
                stdout: stdout.to_string(),
            },
        );
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(id) => Some(id),
                Event::End(_) => None,
            })
            .collect()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        let id = task_id_of(&spec.cwd);
        let behaviour = self
            .behaviours
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or(Behaviour::Exit {
                code: 0,
                stdout: String::new(),
            });

        if let Behaviour::LaunchFailure = behaviour {
            return Err(RunnerError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "program not found"),
            });
        }

        self.events.lock().unwrap().push(Event::Start(id.clone()));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(Event::End(id.clone()));

        match behaviour {
            Behaviour::Exit { code, stdout } => Ok(CommandOutput {
                exit_code: code,
                stdout,
                stderr: String::new(),
                duration_ms: self.delay.as_millis() as u64,
            }),
            Behaviour::Panic => panic!("mock build of {id} panicked"),
            Behaviour::LaunchFailure => unreachable!(),
        }
    }
}

fn task_id_of(cwd: &Path) -> String {
    cwd.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn detector() -> Arc<ErrorDetector> {
    let rules: Vec<Arc<dyn DetectionRule>> = vec![
        Arc::new(RegexRule::new("build", r"^ERROR: (?P<message>.*)$", Severity::Error).unwrap()),
        Arc::new(
            RegexRule::new("build", r"^WARNING: (?P<message>.*)$", Severity::Warning).unwrap(),
        ),
    ];
    Arc::new(ErrorDetector::new(rules))
}

pub fn task(id: &str) -> BuildTask {
    let folder = format!("/virtual/{id}");
    let cmd = CommandSpec::new("build", &folder);
    BuildTask::new(BuildJob::new(id, &folder, vec![cmd], detector()).with_quiet(true))
}

pub fn scheduler(runner: &Arc<MockRunner>, limit: usize, ids: &[&str]) -> TaskScheduler {
    let opts = ExecutionOpts::default().with_concurrency(limit).quiet(true);
    let mut s = TaskScheduler::new(runner.clone(), opts);
    for id in ids {
        s.add_task(task(id)).unwrap();
    }
    s
}
