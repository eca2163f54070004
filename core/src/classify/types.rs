use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    /// Parses the severity words emitted by compilers and linters.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects how findings are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingMode {
    /// Human readable lines for local builds.
    #[default]
    Local,
    /// `##vso[task.logissue ...]` logging commands understood by
    /// Visual Studio Online / Azure Pipelines.
    Vso,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// What a single rule extracted from a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub severity: Severity,
    pub location: Option<SourceLocation>,
    pub code: Option<String>,
    pub text: String,
}

/// A classified line of build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// 1-based index of the output line that produced this finding.
    pub source_line: usize,
    /// Name of the rule that matched.
    pub rule: String,
    pub location: Option<SourceLocation>,
    pub code: Option<String>,
    /// Rendered according to the active [`ReportingMode`].
    pub message: String,
}

impl Finding {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
