//! `hadolint/DL3004`: do not use `sudo`. RUN already executes as root (or
//! as the configured USER); sudo only obscures which user a step needs.

use crate::rules::hadolint::shell_runs;
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::shell::find_commands;
use crate::violations::{Severity, TextRange, Violation};

pub struct NoSudo;

impl Rule for NoSudo {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://github.com/hadolint/hadolint/wiki/DL3004"),
            ..RuleMetadata::new(
                "hadolint/DL3004",
                "no-sudo",
                "Do not use sudo; use USER to switch users",
                Severity::Error,
                RuleCategory::Security,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (stage, _, script, variant) in shell_runs(input) {
            for cmd in find_commands(&script.text, variant, &["sudo"]) {
                let (line, col) = script.file_position(cmd.line, cmd.col);
                let (_, end_col) = script.file_position(cmd.line, cmd.end_col);
                violations.push(
                    Violation::new(
                        input.path,
                        TextRange::on_line(line + 1, col, end_col),
                        self.metadata().code,
                        "do not use sudo; use USER to switch to the required user",
                        self.metadata().default_severity,
                    )
                    .with_doc_url(self.metadata().doc_url.unwrap())
                    .with_snippet(input.source.line(line))
                    .in_stage(stage),
                );
            }
        }

        violations
    }
}
