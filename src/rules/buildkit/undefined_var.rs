//! `buildkit/UndefinedVar`: a variable is referenced where nothing in scope
//! defines it. The semantic builder's environment approximation does the
//! heavy lifting; this rule just surfaces its findings.

use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::violations::{Severity, TextRange, Violation};

pub struct UndefinedVar;

impl Rule for UndefinedVar {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://docs.docker.com/reference/build-checks/undefined-var/"),
            ..RuleMetadata::new(
                "buildkit/UndefinedVar",
                "undefined-var",
                "Reference to an undefined build variable",
                Severity::Warning,
                RuleCategory::Correctness,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for info in input.model.stages() {
            for var in &info.undefined_vars {
                let line_text = input.source.line(var.line);
                // point at the reference when it is findable on the line
                let (start_col, end_col) = match line_text.find(&format!("${}", var.name)) {
                    Some(col) => (col, col + var.name.len() + 1),
                    None => (0, line_text.len()),
                };

                let mut violation = Violation::new(
                    input.path,
                    TextRange::on_line(var.line + 1, start_col, end_col),
                    self.metadata().code,
                    format!("usage of undefined variable '${}'", var.name),
                    self.metadata().default_severity,
                )
                .with_doc_url(self.metadata().doc_url.unwrap())
                .with_snippet(line_text)
                .in_stage(info.index);

                if let Some(suggestion) = &var.suggestion {
                    violation = violation.with_detail(format!("did you mean '${suggestion}'?"));
                }
                violations.push(violation);
            }
        }

        violations
    }
}
