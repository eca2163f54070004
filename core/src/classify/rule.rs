use regex::{Captures, Regex};
use thiserror::Error;

use super::types::{RuleMatch, Severity, SourceLocation};

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid pattern for rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}' could not read {field} from '{value}'")]
    BadCapture {
        rule: String,
        field: &'static str,
        value: String,
    },
}

/// A pure line predicate paired with the extraction of a [`RuleMatch`].
pub trait DetectionRule: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `Ok(None)` for lines the rule does not care about.
    fn detect(&self, line: &str) -> Result<Option<RuleMatch>, RuleError>;
}

/// Regex backed rule.
///
/// The pattern may use these named groups, all optional:
/// `severity`, `file`, `line`, `col`, `code`, `message`.
/// Without a `message` group the whole (trimmed) line becomes the text.
/// A `severity` group overrides the rule's default severity when it holds a
/// recognised word such as `error` or `WARNING`.
#[derive(Debug, Clone)]
pub struct RegexRule {
    name: String,
    regex: Regex,
    severity: Severity,
}

impl RegexRule {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        severity: Severity,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            rule: name.clone(),
            source,
        })?;
        Ok(Self {
            name,
            regex,
            severity,
        })
    }

    fn number(&self, caps: &Captures<'_>, field: &'static str) -> Result<u32, RuleError> {
        let Some(m) = caps.name(field) else {
            return Ok(0);
        };
        m.as_str()
            .trim()
            .parse::<u32>()
            .map_err(|_| RuleError::BadCapture {
                rule: self.name.clone(),
                field,
                value: m.as_str().to_string(),
            })
    }
}

impl DetectionRule for RegexRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, line: &str) -> Result<Option<RuleMatch>, RuleError> {
        let Some(caps) = self.regex.captures(line) else {
            return Ok(None);
        };

        let severity = caps
            .name("severity")
            .and_then(|m| Severity::from_word(m.as_str()))
            .unwrap_or(self.severity);

        let location = match caps.name("file") {
            Some(file) => Some(SourceLocation {
                file: file.as_str().trim().to_string(),
                line: self.number(&caps, "line")?,
                column: self.number(&caps, "col")?,
            }),
            None => None,
        };

        let code = caps.name("code").map(|m| m.as_str().to_string());
        let text = caps
            .name("message")
            .map(|m| m.as_str())
            .unwrap_or(line)
            .trim()
            .to_string();

        Ok(Some(RuleMatch {
            severity,
            location,
            code,
            text,
        }))
    }
}
