//! `hadolint/DL3027`: do not use `apt` in scripts. Its CLI is not stable;
//! `apt-get` (or `apt-cache`) is the scriptable interface.

use crate::rules::hadolint::shell_runs;
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::shell::find_commands;
use crate::violations::{FixSafety, Severity, SuggestedFix, TextEdit, TextRange, Violation};

pub struct AptInsteadOfAptGet;

impl Rule for AptInsteadOfAptGet {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://github.com/hadolint/hadolint/wiki/DL3027"),
            ..RuleMetadata::new(
                "hadolint/DL3027",
                "apt-instead-of-apt-get",
                "Do not use apt; it is meant for end users",
                Severity::Warning,
                RuleCategory::Correctness,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (stage, _, script, variant) in shell_runs(input) {
            for cmd in find_commands(&script.text, variant, &["apt"]) {
                let (line, col) = script.file_position(cmd.line, cmd.col);
                let (_, end_col) = script.file_position(cmd.line, cmd.end_col);
                let range = TextRange::on_line(line + 1, col, end_col);

                violations.push(
                    Violation::new(
                        input.path,
                        range,
                        self.metadata().code,
                        "do not use apt as it is meant to be an end-user tool; use apt-get or apt-cache instead",
                        self.metadata().default_severity,
                    )
                    .with_doc_url(self.metadata().doc_url.unwrap())
                    .with_snippet(input.source.line(line))
                    .with_fix(
                        SuggestedFix::new(
                            "replace apt with apt-get",
                            vec![TextEdit {
                                file: input.path.to_path_buf(),
                                range,
                                replacement: "apt-get".to_string(),
                            }],
                            FixSafety::Safe,
                        )
                        .preferred(),
                    )
                    .in_stage(stage),
                );
            }
        }

        violations
    }
}
