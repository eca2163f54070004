//! Rule-based classification of build output.
//!
//! An [`ErrorDetector`] owns an ordered set of [`DetectionRule`]s and turns
//! raw process output into [`Finding`]s. The [`ReportingMode`] only affects
//! how a finding is rendered, never whether a line matches.

mod detector;
mod render;
mod rule;
mod types;

pub use detector::{partition_findings, ErrorDetector, MatchPolicy};
pub use render::render_match;
pub use rule::{DetectionRule, RegexRule, RuleError};
pub use types::{Finding, ReportingMode, RuleMatch, Severity, SourceLocation};
