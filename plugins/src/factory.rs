use std::sync::Arc;

use anyhow::{bail, Context, Result};

use stackbuild_core::classify::{DetectionRule, ErrorDetector, RegexRule};
use stackbuild_core::config::DetectionConfig;
use stackbuild_core::runner::CommandRunner;

use crate::detectors::{TestFailureRule, TsLintRule, TypeScriptRule};
use crate::runner::ProcessRunner;

/// Instantiates the configured rule set: built-in rules in the order they are
/// listed, then custom rules in declaration order.
pub fn build_rules(cfg: &DetectionConfig) -> Result<Vec<Arc<dyn DetectionRule>>> {
    let mut rules: Vec<Arc<dyn DetectionRule>> = Vec::new();

    for name in &cfg.rules {
        let rule: Arc<dyn DetectionRule> = match name.as_str() {
            TestFailureRule::NAME => Arc::new(TestFailureRule::new()?),
            TypeScriptRule::NAME => Arc::new(TypeScriptRule::new()?),
            TsLintRule::NAME => Arc::new(TsLintRule::new()?),
            other => bail!(
                "unknown detection rule '{}' (expected one of: {}, {}, {})",
                other,
                TestFailureRule::NAME,
                TypeScriptRule::NAME,
                TsLintRule::NAME
            ),
        };
        rules.push(rule);
    }

    for custom in &cfg.custom_rules {
        let rule = RegexRule::new(&custom.name, &custom.pattern, custom.severity)
            .with_context(|| format!("invalid custom rule '{}'", custom.name))?;
        rules.push(Arc::new(rule));
    }

    Ok(rules)
}

pub fn build_detector(cfg: &DetectionConfig) -> Result<ErrorDetector> {
    let detector = ErrorDetector::new(build_rules(cfg)?).with_policy(cfg.match_policy);
    tracing::debug!(rules = ?detector.rule_names(), policy = ?detector.policy(), "detector ready");
    Ok(detector)
}

pub fn build_runner() -> Arc<dyn CommandRunner> {
    Arc::new(ProcessRunner::new())
}
