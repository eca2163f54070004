//! Built-in detection rules for the tools a monorepo build usually runs.
//!
//! Each rule wraps a [`RegexRule`] with a fixed pattern and is registered in
//! configuration under its [`DetectionRule::name`].

mod tslint;
mod typescript;

pub use test::TestFailureRule;
pub use tslint::TsLintRule;
pub use typescript::TypeScriptRule;

use stackbuild_core::classify::{DetectionRule, RuleError, RuleMatch};

macro_rules! delegate_rule {
    ($ty:ty) => {
        impl DetectionRule for $ty {
            fn name(&self) -> &str {
                self.inner.name()
            }

            fn detect(&self, line: &str) -> Result<Option<RuleMatch>, RuleError> {
                self.inner.detect(line)
            }
        }
    };
}

delegate_rule!(TestFailureRule);
delegate_rule!(TsLintRule);
delegate_rule!(TypeScriptRule);

/// Optional `[tool]` prefix some build wrappers put in front of each line.
const TOOL_PREFIX: &str = r"(?:\[[^\]]+\]\s*)?";
