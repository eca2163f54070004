use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

pub const CONFIG_FILE_NAME: &str = "stackbuild.toml";

/// Loads `explicit` if given, otherwise `./stackbuild.toml`.
pub fn load_default(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(CONFIG_FILE_NAME),
    };
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg = toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    cfg.root = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;

    tracing::debug!(
        path = %path.display(),
        projects = cfg.projects.len(),
        "loaded configuration"
    );
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut AppConfig) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var("STACKBUILD_MAX_PARALLEL") {
        if !v.trim().is_empty() {
            let n = v.trim().parse::<usize>().map_err(|_| {
                ConfigError::Invalid(format!("STACKBUILD_MAX_PARALLEL is not a number: {v}"))
            })?;
            cfg.build.max_parallel = Some(n);
        }
    }
    if let Ok(v) = std::env::var("STACKBUILD_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }
    Ok(())
}

fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for project in &cfg.projects {
        if project.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "project entry with an empty name".to_string(),
            ));
        }
        if !seen.insert(project.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "project '{}' is declared more than once",
                project.name
            )));
        }
    }
    if cfg.build.program.trim().is_empty() {
        return Err(ConfigError::Invalid("build.program is empty".to_string()));
    }
    Ok(())
}
