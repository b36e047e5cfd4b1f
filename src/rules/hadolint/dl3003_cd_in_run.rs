//! `hadolint/DL3003`: use WORKDIR instead of `cd` in RUN. A `cd` only
//! affects the RUN it appears in, which is rarely what the author meant.

use crate::rules::hadolint::shell_runs;
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::shell::{extract_commands_between_cds, find_command_in_chain, ShellVariant};
use crate::violations::{FixSafety, Severity, SuggestedFix, TextEdit, TextRange, Violation};

pub struct CdInRun;

impl Rule for CdInRun {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://github.com/hadolint/hadolint/wiki/DL3003"),
            ..RuleMetadata::new(
                "hadolint/DL3003",
                "cd-in-run",
                "Use WORKDIR to switch to a directory",
                Severity::Warning,
                RuleCategory::Correctness,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (stage, run, script, variant) in shell_runs(input) {
            let Some(hit) =
                find_command_in_chain(&script.text, variant, |c| c.basename() == "cd")
            else {
                continue;
            };

            let (line, col) = script.file_position(hit.command.line, hit.command.col);
            let (_, end_col) = script.file_position(hit.command.line, hit.command.end_col);

            let mut violation = Violation::new(
                input.path,
                TextRange::on_line(line + 1, col, end_col),
                self.metadata().code,
                "use WORKDIR to switch to a directory instead of `cd`",
                self.metadata().default_severity,
            )
            .with_doc_url(self.metadata().doc_url.unwrap())
            .with_snippet(input.source.line(line))
            .in_stage(stage);

            if let Some(replacement) = rewrite_with_workdir(&script.text, variant) {
                let range =
                    crate::parse::range_for_span(input.source, run.span.start, run.span.end);
                violation = violation.with_fix(SuggestedFix::new(
                    "replace `cd` with WORKDIR instructions",
                    vec![TextEdit { file: input.path.to_path_buf(), range, replacement }],
                    FixSafety::Suggestion,
                ));
            }

            violations.push(violation);
        }

        violations
    }
}

/// Rewrites `RUN a && cd /x && b && cd /y && c` into alternating
/// WORKDIR/RUN instructions. Returns `None` when any `cd` is too clever to
/// rewrite (flags, no argument, more than one argument).
fn rewrite_with_workdir(script: &str, variant: ShellVariant) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut rest = script.to_string();

    loop {
        match find_command_in_chain(&rest, variant, |c| c.basename() == "cd") {
            Some(hit) => {
                let dir = match hit.command.args.as_slice() {
                    [dir] if !dir.starts_with('-') => dir.clone(),
                    _ => return None,
                };
                if !hit.preceding.is_empty() {
                    parts.push(format!("RUN {}", hit.preceding));
                }
                parts.push(format!("WORKDIR {dir}"));
                let (between, leftover) = extract_commands_between_cds(&hit.remaining, variant);
                if !between.is_empty() {
                    parts.push(format!("RUN {between}"));
                }
                if leftover.is_empty() {
                    break;
                }
                rest = leftover;
            }
            None => {
                if !rest.trim().is_empty() {
                    parts.push(format!("RUN {}", rest.trim()));
                }
                break;
            }
        }
    }

    Some(parts.join("\n"))
}
