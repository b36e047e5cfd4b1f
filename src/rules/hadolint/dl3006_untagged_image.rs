//! `hadolint/DL3006`: pin base image tags. An untagged reference floats to
//! `latest` and makes builds unreproducible.

use dockerfile_parser::ImageRef;

use crate::parse::range_for_span;
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::violations::{Severity, Violation};

pub struct UntaggedImage;

impl Rule for UntaggedImage {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://github.com/hadolint/hadolint/wiki/DL3006"),
            ..RuleMetadata::new(
                "hadolint/DL3006",
                "untagged-image",
                "Always tag the version of an image explicitly",
                Severity::Warning,
                RuleCategory::Correctness,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for info in input.model.stages() {
            if !info.base.is_external_image() {
                continue;
            }
            // unexpandable variables make the ref unjudgeable, and a digest
            // pin is stricter than any tag; stay quiet for both
            if info.base.raw.contains('$') || info.base.raw.contains('@') {
                continue;
            }
            if ImageRef::parse(&info.base.raw).tag.is_some() {
                continue;
            }

            let (start, end) = info.base.span;
            violations.push(
                Violation::new(
                    input.path,
                    range_for_span(input.source, start, end),
                    self.metadata().code,
                    format!("image `{}` has no explicit tag or digest", info.base.raw),
                    self.metadata().default_severity,
                )
                .with_doc_url(self.metadata().doc_url.unwrap())
                .with_snippet(input.source.line(info.base.line))
                .in_stage(info.index),
            );
        }

        violations
    }
}
