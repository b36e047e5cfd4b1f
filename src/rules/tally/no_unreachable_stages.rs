//! `tally/no-unreachable-stages`: a stage no dependency chain connects to
//! the final stage is dead weight; it still builds, costing time and cache.

use crate::parse::range_for_span;
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::violations::{Severity, Violation};

pub struct NoUnreachableStages;

impl Rule for NoUnreachableStages {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata::new(
            "tally/no-unreachable-stages",
            "no-unreachable-stages",
            "Every stage should contribute to the final image",
            Severity::Warning,
            RuleCategory::Performance,
        )
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for index in input.model.unreachable_stages() {
            let Some(info) = input.model.stage_info(index) else {
                continue;
            };
            let label = info
                .name
                .as_deref()
                .map(|n| format!("\"{n}\""))
                .unwrap_or_else(|| info.base.raw.clone());

            let (start, end) = info.base.span;
            violations.push(
                Violation::new(
                    input.path,
                    range_for_span(input.source, start, end),
                    self.metadata().code,
                    format!("stage {label} (index {index}) is never used in the final image"),
                    self.metadata().default_severity,
                )
                .with_detail("remove the stage, or COPY something out of it")
                .with_snippet(input.source.line(info.from_line))
                .in_stage(index),
            );
        }

        violations
    }
}
