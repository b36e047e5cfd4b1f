//! `buildkit/MaintainerDeprecated`: the MAINTAINER instruction is
//! deprecated; an OCI authors label carries the same information.

use dockerfile_parser::Instruction;

use crate::parse::{instruction_kind, instruction_span, range_for_span};
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::violations::{FixSafety, Severity, SuggestedFix, TextEdit, Violation};

pub struct MaintainerDeprecated;

impl Rule for MaintainerDeprecated {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://docs.docker.com/reference/build-checks/maintainer-deprecated/"),
            ..RuleMetadata::new(
                "buildkit/MaintainerDeprecated",
                "maintainer-deprecated",
                "MAINTAINER is deprecated; use a LABEL instead",
                Severity::Warning,
                RuleCategory::Deprecation,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut stage: i32 = -1;

        for ins in &input.parse.ast.instructions {
            if matches!(ins, Instruction::From(_)) {
                stage += 1;
                continue;
            }
            let Instruction::Misc(misc) = ins else {
                continue;
            };
            if instruction_kind(ins) != "MAINTAINER" {
                continue;
            }

            let (start, end) = instruction_span(ins);
            let range = range_for_span(input.source, start, end);
            let author = misc.arguments.to_string().trim().to_string();
            let replacement =
                format!("LABEL org.opencontainers.image.authors=\"{author}\"");

            let mut violation = Violation::new(
                input.path,
                range,
                self.metadata().code,
                "MAINTAINER is deprecated; use LABEL org.opencontainers.image.authors instead",
                self.metadata().default_severity,
            )
            .with_doc_url(self.metadata().doc_url.unwrap())
            .with_snippet(input.source.line(range.start_line - 1))
            .with_fix(
                SuggestedFix::new(
                    "replace MAINTAINER with an OCI authors label",
                    vec![TextEdit {
                        file: input.path.to_path_buf(),
                        range,
                        replacement,
                    }],
                    FixSafety::Safe,
                )
                .preferred(),
            );
            if stage >= 0 {
                violation.stage = stage;
            }
            violations.push(violation);
        }

        violations
    }
}
