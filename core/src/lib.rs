//! Core of stackbuild: builds every project of a monorepo in dependency
//! order, in parallel, and classifies build output into errors and warnings.

pub mod classify;
pub mod config;
pub mod error;
pub mod executor;
pub mod runner;

pub use error::{CliError, ConfigError, RunnerError, SchedulerError};
