use std::io::{self, Write};

use super::task::{BuildTask, TaskLike};
use super::types::{ExecutionOpts, ExecutionReport, FailureReason, TaskState};

/// Emit execution plan (verbose only)
pub fn emit_execution_plan(
    out: &mut impl Write,
    opts: &ExecutionOpts,
    stages: &[Vec<String>],
) -> io::Result<()> {
    if opts.verbose && !opts.quiet {
        writeln!(out, "Execution plan:")?;
        for (i, stage) in stages.iter().enumerate() {
            writeln!(out, "  Level {}: {}", i, stage.join(", "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Emit run start line
pub fn emit_run_start(
    out: &mut impl Write,
    opts: &ExecutionOpts,
    total_tasks: usize,
) -> io::Result<()> {
    if !opts.quiet {
        writeln!(
            out,
            "Building {} projects (max {} in parallel)",
            total_tasks, opts.concurrency_limit
        )?;
    }
    Ok(())
}

/// Emit task start line
pub fn emit_task_start(
    out: &mut impl Write,
    opts: &ExecutionOpts,
    task: &BuildTask,
) -> io::Result<()> {
    if opts.quiet {
        return Ok(());
    }
    writeln!(out, "[{}] started", task.id())?;
    if opts.verbose {
        for spec in task.job().commands() {
            writeln!(out, "[{}] $ {}", task.id(), spec.display())?;
        }
    }
    Ok(())
}

/// Emit task completion line plus its findings.
///
/// Errors of a failed task are printed even in quiet mode.
pub fn emit_task_complete(
    out: &mut impl Write,
    opts: &ExecutionOpts,
    task: &BuildTask,
) -> io::Result<()> {
    if !opts.quiet {
        writeln!(out, "{}", format_task_status(task))?;
        for warning in task.warnings() {
            writeln!(out, "  {}", warning.message)?;
        }
    }

    if task.state() == TaskState::Failed {
        if opts.quiet {
            writeln!(out, "{}", format_task_status(task))?;
        }
        for error in task.errors() {
            writeln!(out, "  {}", error.message)?;
        }
    }
    Ok(())
}

/// Emit the line for a task failed because of a dependency.
pub fn emit_task_skipped(
    out: &mut impl Write,
    opts: &ExecutionOpts,
    task: &BuildTask,
) -> io::Result<()> {
    if !opts.quiet {
        writeln!(out, "{}", format_task_status(task))?;
    }
    Ok(())
}

/// Emit final summary. Printed regardless of quiet mode.
pub fn emit_run_end(out: &mut impl Write, report: &ExecutionReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", format_summary(report))
}

pub fn format_task_status(task: &BuildTask) -> String {
    let name = task.id();
    match (task.state(), task.failure()) {
        (TaskState::Succeeded, _) => {
            let warnings = task.warnings().len();
            if warnings > 0 {
                format!(
                    "[{}] completed with {} warning(s) ({}ms)",
                    name,
                    warnings,
                    task.duration_ms()
                )
            } else {
                format!("[{}] completed ({}ms)", name, task.duration_ms())
            }
        }
        (_, Some(reason @ FailureReason::DependencyFailed { .. })) => {
            format!("[{}] {}", name, reason)
        }
        (_, Some(reason)) => format!("[{}] failed: {} ({}ms)", name, reason, task.duration_ms()),
        (state, None) => format!("[{}] {:?}", name, state),
    }
}

pub fn format_summary(report: &ExecutionReport) -> String {
    let mut out = format!(
        "{} succeeded, {} failed, {} skipped of {} projects in {:.2}s",
        report.succeeded,
        report.failed,
        report.skipped,
        report.total_tasks,
        report.duration_ms as f64 / 1000.0
    );

    let failed = report.failed_ids();
    if !failed.is_empty() {
        out.push_str(&format!("\nFailed: {}", failed.join(", ")));
    }
    let skipped = report.skipped_ids();
    if !skipped.is_empty() {
        out.push_str(&format!("\nSkipped: {}", skipped.join(", ")));
    }
    out
}
