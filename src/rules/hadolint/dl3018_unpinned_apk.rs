//! `hadolint/DL3018`: pin versions in `apk add`. Unpinned packages drift
//! between builds of the same Dockerfile.

use itertools::Itertools;

use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::shell::PackageManager;
use crate::violations::{Severity, TextRange, Violation};

pub struct UnpinnedApkPackages;

impl Rule for UnpinnedApkPackages {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            doc_url: Some("https://github.com/hadolint/hadolint/wiki/DL3018"),
            ..RuleMetadata::new(
                "hadolint/DL3018",
                "unpinned-apk-packages",
                "Pin versions in apk add",
                Severity::Warning,
                RuleCategory::Correctness,
            )
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let mut violations = Vec::new();

        for info in input.model.stages() {
            for install in &info.packages {
                if install.manager != PackageManager::Apk {
                    continue;
                }
                let unpinned: Vec<&str> = install
                    .packages
                    .iter()
                    .filter(|p| !p.contains('=') && !p.starts_with('.'))
                    .map(String::as_str)
                    .collect();
                if unpinned.is_empty() {
                    continue;
                }

                let line_text = input.source.line(install.line);
                violations.push(
                    Violation::new(
                        input.path,
                        TextRange::on_line(install.line + 1, 0, line_text.len()),
                        self.metadata().code,
                        format!(
                            "pin versions in apk add (`{}`); use `apk add <package>=<version>`",
                            unpinned.iter().join("`, `")
                        ),
                        self.metadata().default_severity,
                    )
                    .with_doc_url(self.metadata().doc_url.unwrap())
                    .with_snippet(line_text)
                    .in_stage(info.index),
                );
            }
        }

        violations
    }
}
