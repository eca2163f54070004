use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stackbuild", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to stackbuild.toml (defaults to ./stackbuild.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the execution plan and extra per-task detail.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean and rebuild every project in dependency order.
    Rebuild(RebuildArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RebuildArgs {
    /// Only show errors and the final summary.
    #[arg(short, long)]
    pub quiet: bool,

    /// Pass the production flag to each project's test command.
    #[arg(long)]
    pub production: bool,

    /// Report findings as Visual Studio Online logging commands.
    #[arg(long)]
    pub vso: bool,

    /// Maximum number of projects built at once.
    #[arg(long, value_name = "N")]
    pub parallelism: Option<usize>,

    /// Show a progress bar while projects build (live output is not echoed).
    #[arg(long)]
    pub progress: bool,
}
