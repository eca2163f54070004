/// Options for one scheduler run.
#[derive(Debug, Clone)]
pub struct ExecutionOpts {
    /// Maximum number of builds running at the same time.
    pub concurrency_limit: usize,

    /// Quiet mode (only errors and the final summary)
    pub quiet: bool,

    /// Verbose output (execution plan and command lines)
    pub verbose: bool,

    /// Enable visual progress bar (ignored when quiet)
    pub progress_bar: bool,
}

impl Default for ExecutionOpts {
    fn default() -> Self {
        Self {
            concurrency_limit: num_cpus::get().max(1),
            quiet: false,
            verbose: false,
            progress_bar: false,
        }
    }
}

impl ExecutionOpts {
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}
