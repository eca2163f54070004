use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::render::render_match;
use super::rule::DetectionRule;
use super::types::{Finding, ReportingMode};

/// What happens when more than one rule matches the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Every matching rule contributes a finding, in rule order.
    #[default]
    Accumulate,
    /// Only the first matching rule contributes a finding.
    FirstMatch,
}

/// Ordered rule set applied line by line.
#[derive(Clone, Default)]
pub struct ErrorDetector {
    rules: Vec<Arc<dyn DetectionRule>>,
    policy: MatchPolicy,
}

impl std::fmt::Debug for ErrorDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorDetector")
            .field("rules", &self.rule_names())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ErrorDetector {
    pub fn new(rules: Vec<Arc<dyn DetectionRule>>) -> Self {
        Self {
            rules,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Classifies every line independently.
    ///
    /// Findings come out in line order, then rule order within a line. A
    /// rule that fails on a line is logged and contributes nothing for it.
    pub fn classify<'a, I>(&self, lines: I, mode: ReportingMode) -> Vec<Finding>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut findings = Vec::new();

        for (idx, line) in lines.into_iter().enumerate() {
            for rule in &self.rules {
                let m = match rule.detect(line) {
                    Ok(Some(m)) => m,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(rule = rule.name(), line = idx + 1, "{}", e);
                        continue;
                    }
                };

                findings.push(Finding {
                    severity: m.severity,
                    source_line: idx + 1,
                    rule: rule.name().to_string(),
                    message: render_match(rule.name(), &m, mode),
                    location: m.location,
                    code: m.code,
                });

                if self.policy == MatchPolicy::FirstMatch {
                    break;
                }
            }
        }

        findings
    }
}

/// Splits findings into `(errors, warnings)`, keeping their order.
pub fn partition_findings(findings: Vec<Finding>) -> (Vec<Finding>, Vec<Finding>) {
    findings
        .into_iter()
        .partition(Finding::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{RegexRule, RuleError, RuleMatch, Severity};
    use pretty_assertions::assert_eq;

    struct Exploding;

    impl DetectionRule for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn detect(&self, line: &str) -> Result<Option<RuleMatch>, RuleError> {
            Err(RuleError::BadCapture {
                rule: "exploding".to_string(),
                field: "line",
                value: line.to_string(),
            })
        }
    }

    fn rule(name: &str, pattern: &str, severity: Severity) -> Arc<dyn DetectionRule> {
        Arc::new(RegexRule::new(name, pattern, severity).unwrap())
    }

    fn detector() -> ErrorDetector {
        ErrorDetector::new(vec![
            rule("fail", r"FAIL (?P<message>.*)", Severity::Error),
            rule("deprecated", r"(?P<message>deprecated.*)", Severity::Warning),
        ])
    }

    #[test]
    fn neutral_lines_produce_nothing() {
        let findings = detector().classify(["compiling", "done"], ReportingMode::Local);
        assert!(findings.is_empty());
    }

    #[test]
    fn accumulates_all_matches_in_rule_order() {
        let lines = ["ok", "FAIL deprecated api", "deprecated flag"];
        let findings = detector().classify(lines, ReportingMode::Local);

        let summary: Vec<(usize, &str, Severity)> = findings
            .iter()
            .map(|f| (f.source_line, f.rule.as_str(), f.severity))
            .collect();
        assert_eq!(
            summary,
            vec![
                (2, "fail", Severity::Error),
                (2, "deprecated", Severity::Warning),
                (3, "deprecated", Severity::Warning),
            ]
        );
    }

    #[test]
    fn first_match_policy_stops_after_one_rule() {
        let findings = detector()
            .with_policy(MatchPolicy::FirstMatch)
            .classify(["FAIL deprecated api"], ReportingMode::Local);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "fail");
    }

    #[test]
    fn mode_changes_rendering_only() {
        let lines = ["FAIL one", "noise", "deprecated two"];
        let local = detector().classify(lines, ReportingMode::Local);
        let vso = detector().classify(lines, ReportingMode::Vso);

        assert_eq!(local.len(), vso.len());
        for (l, v) in local.iter().zip(vso.iter()) {
            assert_eq!(l.severity, v.severity);
            assert_eq!(l.source_line, v.source_line);
            assert_eq!(l.rule, v.rule);
        }
        assert_eq!(local[0].message, "[fail] error: one");
        assert_eq!(vso[0].message, "##vso[task.logissue type=error;]one");
    }

    #[test]
    fn classification_is_deterministic() {
        let lines = ["FAIL a", "deprecated b", "FAIL deprecated c"];
        let d = detector();
        assert_eq!(
            d.classify(lines, ReportingMode::Vso),
            d.classify(lines, ReportingMode::Vso)
        );
    }

    #[test]
    fn failing_rule_is_skipped_not_fatal() {
        let d = ErrorDetector::new(vec![
            Arc::new(Exploding),
            rule("fail", r"FAIL (?P<message>.*)", Severity::Error),
        ]);
        let findings = d.classify(["FAIL still reported"], ReportingMode::Local);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "fail");
    }

    #[test]
    fn partition_keeps_order() {
        let findings = detector().classify(
            ["deprecated x", "FAIL y", "FAIL z"],
            ReportingMode::Local,
        );
        let (errors, warnings) = partition_findings(findings);
        assert_eq!(errors.iter().map(|f| f.source_line).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(warnings.len(), 1);
    }
}
