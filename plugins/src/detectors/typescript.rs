use stackbuild_core::classify::{RegexRule, RuleError, Severity};

use super::TOOL_PREFIX;

/// `tsc` diagnostics: `src/a.ts(12,5): error TS2304: Cannot find name 'x'.`
#[derive(Debug, Clone)]
pub struct TypeScriptRule {
    pub(super) inner: RegexRule,
}

impl TypeScriptRule {
    pub const NAME: &'static str = "typescript";

    pub fn new() -> Result<Self, RuleError> {
        let pattern = format!(
            r"^{TOOL_PREFIX}(?P<file>[^\s(][^(]*)\((?P<line>\d+),(?P<col>\d+)\):\s+(?P<severity>error|warning)\s+(?P<code>TS\d+):\s*(?P<message>.*)$"
        );
        Ok(Self {
            inner: RegexRule::new(Self::NAME, &pattern, Severity::Error)?,
        })
    }
}
