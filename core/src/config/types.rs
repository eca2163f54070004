use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{MatchPolicy, Severity};
use crate::runner::CommandSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Link file location, relative to the repository root.
    #[serde(default = "default_link_file")]
    pub link_file: String,

    /// Project registry, in build-registration order.
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory containing the configuration file. Filled in by the loader.
    #[serde(skip)]
    pub root: PathBuf,
}

fn default_link_file() -> String {
    "common/temp/link.json".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            link_file: default_link_file(),
            projects: Vec::new(),
            build: BuildConfig::default(),
            detection: DetectionConfig::default(),
            logging: LoggingConfig::default(),
            root: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    pub fn link_file_path(&self) -> PathBuf {
        self.root.join(&self.link_file)
    }

    pub fn project_folder(&self, project: &ProjectConfig) -> PathBuf {
        self.root.join(&project.folder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments of the clean step. Empty disables it.
    #[serde(default = "default_clean_args")]
    pub clean_args: Vec<String>,

    #[serde(default = "default_test_args")]
    pub test_args: Vec<String>,

    /// Appended to the test step for production builds.
    #[serde(default = "default_production_args")]
    pub production_args: Vec<String>,

    /// Write `build.log` / `build.error.log` into each project folder.
    #[serde(default = "default_write_logs")]
    pub write_logs: bool,

    /// Upper bound on concurrently running builds. Defaults to the number
    /// of logical CPUs.
    #[serde(default)]
    pub max_parallel: Option<usize>,
}

fn default_program() -> String {
    "npm".to_string()
}

fn default_clean_args() -> Vec<String> {
    vec!["run".to_string(), "clean".to_string()]
}

fn default_test_args() -> Vec<String> {
    vec!["run".to_string(), "test".to_string()]
}

fn default_production_args() -> Vec<String> {
    vec!["--".to_string(), "--production".to_string()]
}

fn default_write_logs() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            clean_args: default_clean_args(),
            test_args: default_test_args(),
            production_args: default_production_args(),
            write_logs: default_write_logs(),
            max_parallel: None,
        }
    }
}

impl BuildConfig {
    /// Commands a project runs, in order: clean (if configured), then test.
    pub fn commands_for(&self, folder: &Path, production: bool) -> Vec<CommandSpec> {
        let mut commands = Vec::with_capacity(2);

        if !self.clean_args.is_empty() {
            commands.push(CommandSpec::new(&self.program, folder).args(&self.clean_args));
        }

        let mut test = CommandSpec::new(&self.program, folder).args(&self.test_args);
        if production {
            test = test.args(&self.production_args);
        }
        commands.push(test);

        commands
    }

    pub fn concurrency_limit(&self) -> usize {
        self.max_parallel.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default)]
    pub match_policy: MatchPolicy,

    /// Built-in rules to enable, in evaluation order.
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,

    /// User-defined rules, evaluated after the built-in ones.
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleConfig>,
}

fn default_rules() -> Vec<String> {
    vec![
        "test".to_string(),
        "typescript".to_string(),
        "tslint".to_string(),
    ]
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            rules: default_rules(),
            custom_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    pub name: String,
    pub pattern: String,
    #[serde(default = "default_custom_severity")]
    pub severity: Severity,
}

fn default_custom_severity() -> Severity {
    Severity::Error
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "warn" or "stackbuild_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}
