//! `hadolint/DL3020`: use COPY for plain files and directories. ADD's
//! extra behaviors (URL fetching, archive extraction) should be opted into,
//! not stumbled into.

use dockerfile_parser::Instruction;

use crate::parse::{instruction_kind, range_for_span};
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::violations::{FixSafety, Severity, SuggestedFix, TextEdit, Violation};

pub struct AddInsteadOfCopy;

const ARCHIVE_SUFFIXES: &[&str] =
    &[".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz", ".gz", ".bz2", ".xz", ".zip"];

fn is_add_worthy(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || ARCHIVE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

impl Rule for AddInsteadOfCopy {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://github.com/hadolint/hadolint/wiki/DL3020"),
            ..RuleMetadata::new(
                "hadolint/DL3020",
                "add-instead-of-copy",
                "Use COPY instead of ADD for files and folders",
                Severity::Error,
                RuleCategory::Correctness,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for stage in input.parse.stages().iter() {
            for ins in stage.instructions.iter().copied() {
                let Instruction::Misc(misc) = ins else {
                    continue;
                };
                if instruction_kind(ins) != "ADD" {
                    continue;
                }

                let args_text = misc.arguments.to_string();
                let words: Vec<&str> = args_text
                    .split_whitespace()
                    .filter(|w| !w.starts_with("--"))
                    .collect();
                if words.len() < 2 {
                    continue;
                }
                let sources = &words[..words.len() - 1];
                if sources.iter().any(|s| is_add_worthy(s)) {
                    continue;
                }

                // the edit swaps just the keyword token
                let keyword = &misc.instruction;
                let range =
                    range_for_span(input.source, keyword.span.start, keyword.span.end);

                violations.push(
                    Violation::new(
                        input.path,
                        range_for_span(input.source, misc.span.start, misc.span.end),
                        self.metadata().code,
                        "use COPY instead of ADD for files and folders",
                        self.metadata().default_severity,
                    )
                    .with_doc_url(self.metadata().doc_url.unwrap())
                    .with_snippet(input.source.line(range.start_line - 1))
                    .with_fix(
                        SuggestedFix::new(
                            "replace ADD with COPY",
                            vec![TextEdit {
                                file: input.path.to_path_buf(),
                                range,
                                replacement: "COPY".to_string(),
                            }],
                            FixSafety::Safe,
                        )
                        .preferred(),
                    )
                    .in_stage(stage.index),
                );
            }
        }

        violations
    }
}
