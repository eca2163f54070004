use std::io;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::task::JoinHandle;

use stackbuild_core::runner::{CommandOutput, CommandRunner, CommandSpec};
use stackbuild_core::RunnerError;

use super::pump::{pump_stderr, pump_stdout};

/// Runs build commands as child processes of the current process.
///
/// stdin is closed, stdout and stderr are captured in full and, when the
/// spec carries an echo prefix, mirrored line by line to the console.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        let start = Instant::now();

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
        let out_task = pump_stdout(stdout, spec.echo_prefix.clone());
        let err_task = pump_stderr(stderr, spec.echo_prefix.clone());

        let status = child.wait().await.map_err(|source| RunnerError::Wait {
            program: spec.program.clone(),
            source,
        })?;

        let stdout = join_pump(out_task, "stdout").await?;
        let stderr = join_pump(err_task, "stderr").await?;
        let exit_code = status.code().unwrap_or(-1);

        tracing::debug!(
            command = %spec.display(),
            exit_code,
            "process exited"
        );

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn missing_pipe(stream: &'static str) -> RunnerError {
    RunnerError::StreamIo {
        stream,
        source: io::Error::new(io::ErrorKind::BrokenPipe, "stream was not captured"),
    }
}

async fn join_pump(
    handle: JoinHandle<Result<String, RunnerError>>,
    stream: &'static str,
) -> Result<String, RunnerError> {
    handle.await.map_err(|e| RunnerError::StreamIo {
        stream,
        source: io::Error::other(e.to_string()),
    })?
}
