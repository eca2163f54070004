use std::sync::Arc;

use colored::{ColoredString, Colorize};
use stackbuild_core::classify::ReportingMode;
use stackbuild_core::config::{load_link_file, AppConfig};
use stackbuild_core::error::CliError;
use stackbuild_core::executor::{BuildJob, BuildTask, ExecutionOpts, TaskScheduler};
use stackbuild_core::runner::CommandRunner;
use stackbuild_plugins::factory;

use crate::commands::cli::RebuildArgs;

const DONE_MESSAGE: &str = "stackbuild rebuild - Done!";
const ERRORS_MESSAGE: &str = "stackbuild rebuild - Errors!";

/// Runs a full rebuild and returns the process exit code.
pub async fn run_rebuild(
    cfg: &AppConfig,
    args: &RebuildArgs,
    verbose: bool,
) -> Result<i32, CliError> {
    let runner = factory::build_runner();
    let scheduler = build_scheduler(cfg, args, verbose, runner)?;

    let report = scheduler.execute().await?;
    tracing::info!(
        run_id = %report.run_id,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "rebuild finished"
    );

    println!("{}", final_message(report.is_success()));
    Ok(if report.is_success() { 0 } else { 1 })
}

/// Registers one build task per project and wires the link file edges.
pub fn build_scheduler(
    cfg: &AppConfig,
    args: &RebuildArgs,
    verbose: bool,
    runner: Arc<dyn CommandRunner>,
) -> Result<TaskScheduler, CliError> {
    let detector = Arc::new(factory::build_detector(&cfg.detection)?);
    let mode = if args.vso {
        ReportingMode::Vso
    } else {
        ReportingMode::Local
    };

    let limit = args
        .parallelism
        .unwrap_or_else(|| cfg.build.concurrency_limit());
    let opts = ExecutionOpts {
        verbose,
        progress_bar: args.progress,
        ..ExecutionOpts::default()
    }
    .with_concurrency(limit)
    .quiet(args.quiet);

    let mut scheduler = TaskScheduler::new(runner, opts);

    for project in &cfg.projects {
        let folder = cfg.project_folder(project);
        let commands = cfg.build.commands_for(&folder, args.production);
        let job = BuildJob::new(&project.name, &folder, commands, detector.clone())
            .with_mode(mode)
            .with_quiet(!live_echo(args))
            .with_logs(cfg.build.write_logs);
        scheduler.add_task(BuildTask::new(job))?;
    }

    let links = load_link_file(&cfg.link_file_path())?;
    for (id, deps) in &links.local_links {
        scheduler.add_dependencies(id, deps)?;
    }

    Ok(scheduler)
}

/// Build output is echoed line by line unless quiet or a progress bar owns
/// the terminal.
fn live_echo(args: &RebuildArgs) -> bool {
    !args.quiet && !args.progress
}

fn final_message(success: bool) -> ColoredString {
    if success {
        DONE_MESSAGE.green()
    } else {
        ERRORS_MESSAGE.red()
    }
}
