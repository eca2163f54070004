use async_trait::async_trait;

use crate::error::RunnerError;

use super::types::{CommandOutput, CommandSpec};

/// Executes one external command to completion.
///
/// A non-zero exit code is reported through [`CommandOutput::exit_code`];
/// `Err` is reserved for commands that could not be launched or awaited.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError>;
}
