use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Visual progress monitor for a build run
///
/// One overall bar plus a spinner per running project.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    task_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_tasks: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                task_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_tasks as u64));

        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} projects {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn start_task(&mut self, task_id: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(task_id.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert(task_id.to_string(), bar);
    }

    /// Marks a task terminal. Skipped tasks never had a spinner but still
    /// advance the overall bar.
    pub fn complete_task(&mut self, task_id: &str, success: bool) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.task_bars.remove(task_id) {
            let mark = if success { "ok" } else { "FAILED" };
            bar.finish_with_message(format!("{} {}", task_id, mark));
        }

        self.overall.inc(1);
    }

    /// Writes console output without tearing the bars: the bars are
    /// cleared while the text is printed and redrawn below it.
    pub fn emit<F>(&self, write: F)
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        let result = write(&mut buf).and_then(|()| {
            if buf.is_empty() {
                return Ok(());
            }
            let flush = || -> io::Result<()> {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&buf)?;
                stdout.flush()
            };
            if self.enabled {
                self.multi.suspend(flush)
            } else {
                flush()
            }
        });
        if let Err(e) = result {
            tracing::warn!("failed to write console output: {}", e);
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success { "done" } else { "errors" };
        self.overall.finish_with_message(msg);
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
