//! The per-file lint pipeline.
//!
//! validate → parse → build model → construction issues → rules →
//! inline-directive filter → severity overrides → fail-level. Everything
//! that goes wrong inside a file stays inside that file's report; the
//! pipeline itself has no failure mode.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::config::Config;
use crate::directives::{parse_directives, DirectiveParseResult};
use crate::parse::{validate_file, ParseResult};
use crate::rules::{self, HeredocOptions, LintInput};
use crate::semantic::builder::build_model;
use crate::source::SourceMap;
use crate::violations::{Severity, TextRange, Violation};

/// Severities for violations the builder and pipeline emit themselves.
fn construction_severity(code: &str) -> Severity {
    match code {
        "hadolint/DL3022" => Severity::Warning,
        _ => Severity::Error,
    }
}

/// Result of linting one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub violations: Vec<Violation>,
    /// Original content, when the file was readable; fix application and
    /// snippet-hungry formatters use it.
    pub content: Option<String>,
    pub total_lines: usize,
    pub blank_lines: usize,
    pub comment_lines: usize,
    pub parse_failed: bool,
}

impl FileReport {
    fn failed(path: &Path, violation: Violation) -> FileReport {
        FileReport {
            path: path.to_path_buf(),
            violations: vec![violation],
            content: None,
            total_lines: 0,
            blank_lines: 0,
            comment_lines: 0,
            parse_failed: true,
        }
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }
}

/// Lints a file on disk.
pub fn lint_path(path: &Path, config: &Config) -> Result<FileReport> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(lint_bytes(path, &bytes, config))
}

/// Lints raw bytes as if they lived at `path`. Never fails; problems become
/// file-level violations.
pub fn lint_bytes(path: &Path, bytes: &[u8], config: &Config) -> FileReport {
    rules::install_builtin_rules();

    // 1. pre-parse validation
    let content = match validate_file(path, bytes) {
        Ok(content) => content,
        Err(err) => {
            return FileReport::failed(
                path,
                Violation::new(
                    path,
                    TextRange::at(1, 0),
                    "tally/invalid-file",
                    err.to_string(),
                    Severity::Error,
                ),
            );
        }
    };

    // 2. source map + parse
    let map = SourceMap::new(content.as_str());
    let parse = match ParseResult::parse(&map) {
        Ok(parse) => parse,
        Err(err) => {
            let mut report = FileReport::failed(
                path,
                Violation::new(
                    path,
                    TextRange::at(1, 0),
                    "tally/parse-failure",
                    format!("unable to parse Dockerfile: {err}"),
                    Severity::Error,
                ),
            );
            report.content = Some(content);
            return report;
        }
    };

    // 3. inline directives + semantic model
    let validator = |code: &str| rules::is_known_rule(code);
    let directive_validator: Option<&dyn Fn(&str) -> bool> =
        if config.directives.validate_rule_codes {
            Some(&validator)
        } else {
            None
        };
    let directives = parse_directives(&map, directive_validator);
    let model = build_model(&parse, &map, &IndexMap::new(), &directives.shell_directives);

    let mut violations: Vec<Violation> = Vec::new();

    // 4. construction issues become violations
    for issue in model.construction_issues() {
        let mut violation = Violation::new(
            path,
            TextRange::on_line(issue.line + 1, 0, map.line(issue.line).len()),
            issue.code,
            issue.message.clone(),
            construction_severity(issue.code),
        )
        .with_snippet(map.line(issue.line));
        violation.stage = issue.stage;
        violations.push(violation);
    }

    // 5. every enabled rule
    let enabled: IndexSet<String> = rules::all()
        .iter()
        .map(|r| r.metadata().code.to_string())
        .filter(|code| config.is_rule_enabled(code))
        .collect();

    for rule in rules::all() {
        let meta = rule.metadata();
        if !enabled.contains(meta.code) {
            continue;
        }

        let rule_config = match config.rule_config(meta.code) {
            Some(value) => match rule.validate_config(value) {
                Ok(()) => Some(value),
                Err(err) => {
                    warn!(rule = meta.code, error = %err, "invalid rule options; using defaults");
                    None
                }
            },
            None => None,
        };

        let input = LintInput {
            path,
            source: &map,
            parse: &parse,
            model: &model,
            config: rule_config,
            enabled_rules: &enabled,
            heredoc: HeredocOptions { min_commands: config.heredoc.min_commands },
        };

        for mut violation in rule.check(&input) {
            // a rule handing back a nonsense location is itself a defect;
            // demote and clamp rather than dropping the signal
            if violation.range.start_line == 0 || violation.range.start_line > map.line_count() {
                warn!(rule = meta.code, "violation with out-of-file location");
                violation.range = TextRange::at(1, 0);
                violation.severity = Severity::Warning;
            }
            violations.push(violation);
        }
    }

    // 6. inline directive suppression
    if config.directives.enabled {
        violations = apply_directives(path, &map, &directives, violations, config);
    }

    // 7. severity overrides; Off drops the violation
    for violation in &mut violations {
        violation.severity = config.effective_severity(&violation.code, violation.severity);
    }
    violations.retain(|v| v.severity != Severity::Off);

    violations.sort_by(|a, b| {
        (a.range.start_line, a.range.start_col, &a.code).cmp(&(
            b.range.start_line,
            b.range.start_col,
            &b.code,
        ))
    });

    debug!(
        file = %path.display(),
        violations = violations.len(),
        "lint complete"
    );

    FileReport {
        path: path.to_path_buf(),
        violations,
        content: Some(content),
        total_lines: parse.total_lines,
        blank_lines: parse.blank_lines,
        comment_lines: parse.comment_lines,
        parse_failed: false,
    }
}

/// Drops suppressed violations and reports directive problems per config.
fn apply_directives(
    path: &Path,
    map: &SourceMap,
    directives: &DirectiveParseResult,
    violations: Vec<Violation>,
    config: &Config,
) -> Vec<Violation> {
    let mut used = vec![false; directives.directives.len()];

    let mut kept: Vec<Violation> = violations
        .into_iter()
        .filter(|violation| {
            let line0 = violation.range.start_line.saturating_sub(1);
            let mut suppressed = false;
            for (i, directive) in directives.directives.iter().enumerate() {
                if directive.suppresses(&violation.code, line0) {
                    used[i] = true;
                    suppressed = true;
                }
            }
            !suppressed
        })
        .collect();

    if config.directives.validate_rule_codes {
        for error in &directives.errors {
            kept.push(
                Violation::new(
                    path,
                    TextRange::on_line(error.line + 1, 0, map.line(error.line).len()),
                    "tally/invalid-directive",
                    error.message.clone(),
                    Severity::Warning,
                )
                .with_snippet(map.line(error.line)),
            );
        }
    }

    if config.directives.require_reason {
        for directive in &directives.directives {
            if directive.reason.is_none() {
                kept.push(
                    Violation::new(
                        path,
                        TextRange::on_line(directive.line + 1, 0, map.line(directive.line).len()),
                        "tally/invalid-directive",
                        "directive is missing a `;reason=` explanation",
                        Severity::Warning,
                    )
                    .with_snippet(map.line(directive.line)),
                );
            }
        }
    }

    if config.directives.warn_unused {
        for (i, directive) in directives.directives.iter().enumerate() {
            if !used[i] {
                kept.push(
                    Violation::new(
                        path,
                        TextRange::on_line(directive.line + 1, 0, map.line(directive.line).len()),
                        "tally/unused-directive",
                        format!("directive suppresses nothing: `{}`", directive.raw.trim()),
                        Severity::Info,
                    )
                    .with_snippet(map.line(directive.line)),
                );
            }
        }
    }

    kept
}

/// Highest severity across all reports.
pub fn max_severity(reports: &[FileReport]) -> Option<Severity> {
    reports.iter().filter_map(FileReport::max_severity).max()
}

/// 0 when nothing meets the fail level, 1 otherwise.
pub fn exit_code(reports: &[FileReport], fail_level: crate::config::FailLevel) -> i32 {
    let failing = reports
        .iter()
        .flat_map(|r| &r.violations)
        .any(|v| fail_level.is_met_by(v.severity));
    i32::from(failing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn lint(content: &str) -> FileReport {
        lint_bytes(Path::new("Dockerfile"), content.as_bytes(), &Config::default())
    }

    fn lint_with(content: &str, config: &Config) -> FileReport {
        lint_bytes(Path::new("Dockerfile"), content.as_bytes(), config)
    }

    fn codes(report: &FileReport) -> Vec<&str> {
        report.violations.iter().map(|v| v.code.as_str()).collect()
    }

    #[test]
    fn test_empty_file_is_invalid() {
        let report = lint("");
        assert!(report.parse_failed);
        assert_eq!(codes(&report), ["tally/invalid-file"]);
    }

    #[test]
    fn test_clean_file_has_no_violations() {
        let report = lint("FROM alpine:3.18\nRUN echo hello\n");
        assert!(report.violations.is_empty());
        assert_eq!(report.total_lines, 2);
    }

    #[test]
    fn test_construction_issue_surfaces() {
        let report = lint(indoc! {r#"
            FROM alpine:3.18 AS base
            COPY --from=base /a /b
        "#});
        assert!(codes(&report).contains(&"hadolint/DL3023"));
    }

    #[test]
    fn test_directive_suppresses_next_line() {
        let report = lint(indoc! {r#"
            FROM alpine:3.18
            # tally ignore=buildkit/MaintainerDeprecated
            MAINTAINER me@example.com
        "#});
        assert!(!codes(&report).contains(&"buildkit/MaintainerDeprecated"));
    }

    #[test]
    fn test_directive_does_not_suppress_other_lines() {
        let report = lint(indoc! {r#"
            FROM alpine:3.18
            # tally ignore=buildkit/MaintainerDeprecated
            MAINTAINER me@example.com
            MAINTAINER again@example.com
        "#});
        let maintainer_count = report
            .violations
            .iter()
            .filter(|v| v.code == "buildkit/MaintainerDeprecated")
            .count();
        assert_eq!(maintainer_count, 1);
    }

    #[test]
    fn test_global_directive_suppresses_everywhere() {
        let report = lint(indoc! {r#"
            FROM alpine:3.18
            # tally global ignore=buildkit/MaintainerDeprecated
            MAINTAINER me@example.com
            RUN true
            MAINTAINER again@example.com
        "#});
        assert!(!codes(&report).contains(&"buildkit/MaintainerDeprecated"));
    }

    #[test]
    fn test_unused_directive_reported_when_enabled() {
        let mut config = Config::default();
        config.directives.warn_unused = true;
        let report = lint_with("FROM alpine:3.18\n# tally global ignore=hadolint/DL3004\n", &config);
        assert!(codes(&report).contains(&"tally/unused-directive"));
    }

    #[test]
    fn test_severity_override_to_off_drops() {
        let mut config = Config::default();
        config
            .severity_overrides
            .insert("buildkit/MaintainerDeprecated".to_string(), Severity::Off);
        let report = lint_with("FROM alpine:3.18\nMAINTAINER me\n", &config);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_excluded_rule_does_not_run() {
        let mut config = Config::default();
        config.exclude = vec!["buildkit/*".to_string()];
        let report = lint_with("FROM alpine:3.18\nMAINTAINER me\n", &config);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let content = indoc! {r#"
            FROM ubuntu
            RUN apt install python
            RUN cd /opt
            MAINTAINER me
        "#};
        let first = lint(content);
        let second = lint(content);
        assert_eq!(codes(&first), codes(&second));
        let lines: Vec<usize> = first.violations.iter().map(|v| v.range.start_line).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn test_exit_code_respects_fail_level() {
        let report = lint("FROM ubuntu\nRUN cd /opt\n");
        assert_eq!(exit_code(&[report], crate::config::FailLevel::Warning), 1);

        let report = lint("FROM ubuntu\nRUN cd /opt\n");
        assert_eq!(exit_code(&[report], crate::config::FailLevel::Error), 0);

        let report = lint("FROM alpine:3.18\n");
        assert_eq!(exit_code(&[report], crate::config::FailLevel::Warning), 0);
    }

    #[test]
    fn test_powershell_stage_skips_posix_rules() {
        let report = lint(indoc! {r#"
            FROM mcr.microsoft.com/windows/servercore
            SHELL ["powershell", "-command"]
            RUN cd C:\app
        "#});
        assert!(!codes(&report).contains(&"hadolint/DL3003"));
    }
}
