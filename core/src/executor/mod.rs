//! Dependency-aware parallel build executor
//!
//! ```text
//! BuildTask (one per project)
//!   ↓ TaskScheduler::add_task / add_dependencies
//! TaskGraph { nodes, reverse_edges, insertion_order }
//!   ↓ TaskGraph::validate() → unknown ids, detect_cycle()
//!   ↓ TaskGraph::into_indexed()
//! ready set (insertion order) + running set (≤ concurrency_limit)
//!   ↓ BuildJob::run() → TaskOutcome
//! ExecutionReport
//! ```
//!
//! A failed task fails all of its transitive dependents without running
//! them. Nothing is retried.

mod graph;
mod output;
mod progress;
mod scheduler;
mod task;
pub mod types;

pub use graph::{IndexedGraph, TaskGraph};
pub use output::{format_summary, format_task_status};
pub use progress::ProgressMonitor;
pub use scheduler::TaskScheduler;
pub use task::{BuildJob, BuildTask, TaskLike, BUILD_ERROR_LOG_FILE, BUILD_LOG_FILE};
pub use types::{
    ExecutionOpts, ExecutionReport, FailureReason, TaskOutcome, TaskState, TaskSummary,
};
