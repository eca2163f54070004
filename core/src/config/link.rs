use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Persisted local-link graph: project id -> ids it depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFile {
    #[serde(default)]
    pub local_links: BTreeMap<String, Vec<String>>,
}

/// The link file must exist; its absence means the link step never ran.
pub fn load_link_file(path: &Path) -> Result<LinkFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::LinkFileMissing {
            path: path.to_path_buf(),
        });
    }

    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&s).map_err(|source| ConfigError::LinkParse {
        path: path.to_path_buf(),
        source,
    })
}
