use stackbuild_core::classify::{RegexRule, RuleError, Severity};

use super::TOOL_PREFIX;

/// tslint prose formatter: `ERROR: (no-var) src/a.ts[4, 1]: Forbidden 'var'`.
#[derive(Debug, Clone)]
pub struct TsLintRule {
    pub(super) inner: RegexRule,
}

impl TsLintRule {
    pub const NAME: &'static str = "tslint";

    pub fn new() -> Result<Self, RuleError> {
        let pattern = format!(
            r"^{TOOL_PREFIX}(?P<severity>ERROR|WARNING):\s+\((?P<code>[^)]+)\)\s+(?P<file>[^\[]+)\[(?P<line>\d+),\s*(?P<col>\d+)\]:\s*(?P<message>.*)$"
        );
        Ok(Self {
            inner: RegexRule::new(Self::NAME, &pattern, Severity::Error)?,
        })
    }
}
