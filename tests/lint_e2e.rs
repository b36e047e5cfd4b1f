//! End-to-end scenarios through the public pipeline and fix planner.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indoc::indoc;
use pretty_assertions::assert_eq;

use tally::config::Config;
use tally::fix::{apply_fixes, install_builtin_resolvers, CancelToken};
use tally::pipeline::{lint_bytes, FileReport};
use tally::violations::{FixSafety, Severity, Violation};

fn lint(content: &str) -> FileReport {
    lint_bytes(Path::new("Dockerfile"), content.as_bytes(), &Config::default())
}

fn with_code<'a>(report: &'a FileReport, code: &str) -> Vec<&'a Violation> {
    report.violations.iter().filter(|v| v.code == code).collect()
}

/// Applies every fix in `report` up to `safety` and returns the new bytes.
fn fixed(content: &str, report: &FileReport, safety: FixSafety) -> String {
    install_builtin_resolvers();
    let sources: HashMap<PathBuf, String> =
        HashMap::from([(PathBuf::from("Dockerfile"), content.to_string())]);
    let outcomes = apply_fixes(&report.violations, &sources, safety, &CancelToken::new());
    outcomes
        .into_iter()
        .next()
        .map(|o| o.modified)
        .unwrap_or_else(|| content.to_string())
}

#[test]
fn maintainer_is_deprecated_and_fixable() {
    let content = "FROM alpine:3.18\nMAINTAINER test@example.com\n";
    let report = lint(content);

    let found = with_code(&report, "buildkit/MaintainerDeprecated");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, Severity::Warning);
    assert_eq!(found[0].range.start_line, 2);
    assert_eq!(report.violations.len(), 1);

    let fixed = fixed(content, &report, FixSafety::Safe);
    assert_eq!(
        fixed,
        "FROM alpine:3.18\nLABEL org.opencontainers.image.authors=\"test@example.com\"\n"
    );
}

#[test]
fn unreachable_stage_is_reported_once() {
    let content = indoc! {r#"
        FROM golang:1.21 AS builder
        RUN go build -o /app

        FROM golang:1.21 AS unused
        RUN echo "this is never used"

        FROM alpine:3.18
        COPY --from=builder /app /app
    "#};
    let report = lint(content);

    let found = with_code(&report, "tally/no-unreachable-stages");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, Severity::Warning);
    assert_eq!(found[0].range.start_line, 4);
    assert!(found[0].message.contains("unused"));
    assert!(found[0].message.contains("index 1"));
}

#[test]
fn cd_in_run_suggests_workdir() {
    let content = "FROM ubuntu\nRUN cd /opt";
    let report = lint(content);

    let found = with_code(&report, "hadolint/DL3003");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, Severity::Warning);
    assert_eq!(found[0].range.start_line, 2);

    let fix = found[0].fix.as_ref().expect("DL3003 carries a fix");
    assert_eq!(fix.safety, FixSafety::Suggestion);
    let replacement = &fix.edits[0].replacement;
    assert!(replacement.contains("WORKDIR /opt"));
    assert!(!replacement.contains("RUN cd"));
}

#[test]
fn apt_is_replaced_by_apt_get_and_fix_is_idempotent() {
    let content = "FROM ubuntu:22.04\nRUN apt install python\n";
    let report = lint(content);

    let found = with_code(&report, "hadolint/DL3027");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].range.start_line, 2);
    // the physical column of the `apt` token
    assert_eq!(found[0].range.start_col, 4);
    assert_eq!(found[0].range.end_col, 7);

    let fix = found[0].fix.as_ref().unwrap();
    assert_eq!(fix.safety, FixSafety::Safe);

    let fixed_bytes = fixed(content, &report, FixSafety::Safe);
    assert_eq!(fixed_bytes, "FROM ubuntu:22.04\nRUN apt-get install python\n");

    let relint = lint(&fixed_bytes);
    assert!(with_code(&relint, "hadolint/DL3027").is_empty());
}

#[test]
fn next_line_directive_suppresses_maintainer() {
    let content = indoc! {r#"
        FROM alpine
        # tally ignore=buildkit/MaintainerDeprecated
        MAINTAINER me@example.com
    "#};
    let report = lint(content);
    assert!(with_code(&report, "buildkit/MaintainerDeprecated").is_empty());
}

#[test]
fn global_directive_covers_later_occurrences() {
    let content = indoc! {r#"
        FROM alpine
        # tally global ignore=buildkit/MaintainerDeprecated
        MAINTAINER me@example.com
        RUN true
        MAINTAINER other@example.com
    "#};
    let report = lint(content);
    assert!(with_code(&report, "buildkit/MaintainerDeprecated").is_empty());
}

#[test]
fn content_and_structural_fixes_compose_in_one_pass() {
    // two content fixes (apt -> apt-get, net +4 each) plus a priority-97
    // heredoc rewrite of the same RUN; the resolver sees the post-content
    // text, so the final script contains the fixed commands
    let content = "FROM ubuntu:22.04\nRUN apt update && apt install -y x && echo a && echo b\n";
    let report = lint(content);

    assert_eq!(with_code(&report, "hadolint/DL3027").len(), 2);
    assert_eq!(with_code(&report, "tally/prefer-heredoc").len(), 1);

    let fixed_bytes = fixed(content, &report, FixSafety::Suggestion);
    assert_eq!(
        fixed_bytes,
        "FROM ubuntu:22.04\nRUN <<EOF\nset -e\napt-get update\napt-get install -y x\necho a\necho b\nEOF\n"
    );

    // no orphan characters: the heredoc body took the column shifts into
    // account because it was recomputed after the +4 edits
    assert!(!fixed_bytes.contains("apt "));
}

#[test]
fn safe_threshold_applies_safe_fixes_and_skips_suggestions() {
    let content = "FROM ubuntu:22.04\nRUN apt update && apt install -y x && echo a && echo b\n";
    let report = lint(content);

    let fixed_bytes = fixed(content, &report, FixSafety::Safe);
    // content fixes land, the Suggestion-level heredoc rewrite does not
    assert_eq!(
        fixed_bytes,
        "FROM ubuntu:22.04\nRUN apt-get update && apt-get install -y x && echo a && echo b\n"
    );
}

#[test]
fn duplicate_stage_name_count_matches_duplicates() {
    let content = indoc! {r#"
        FROM alpine AS build
        FROM alpine AS BUILD
        FROM alpine AS build
        FROM alpine AS other
    "#};
    let report = lint(content);
    // three declarations of one distinct name: two duplicates
    assert_eq!(with_code(&report, "hadolint/DL3024").len(), 2);
}

#[test]
fn self_referential_copy_from_is_flagged() {
    let content = "FROM alpine AS base\nCOPY --from=base /a /b\n";
    let report = lint(content);
    let found = with_code(&report, "hadolint/DL3023");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].range.start_line, 2);
}

#[test]
fn numeric_copy_from_out_of_range_is_a_violation_not_an_edge() {
    let content = "FROM alpine AS base\nFROM alpine\nCOPY --from=7 /a /b\n";
    let report = lint(content);
    assert_eq!(with_code(&report, "hadolint/DL3022").len(), 1);
    // the bogus ref must not make stage 0 reachable-from-final
    assert_eq!(with_code(&report, "tally/no-unreachable-stages").len(), 1);
}

#[test]
fn powershell_stage_produces_no_posix_rule_violations() {
    let content = indoc! {r#"
        FROM mcr.microsoft.com/windows/servercore:ltsc2022
        SHELL ["powershell", "-command"]
        RUN cd C:\app ; sudo thing
    "#};
    let report = lint(content);
    assert!(with_code(&report, "hadolint/DL3003").is_empty());
    assert!(with_code(&report, "hadolint/DL3004").is_empty());
}

#[test]
fn add_becomes_copy_for_plain_files() {
    let content = "FROM alpine:3.18\nADD src/ /app/\n";
    let report = lint(content);
    let found = with_code(&report, "hadolint/DL3020");
    assert_eq!(found.len(), 1);

    let fixed_bytes = fixed(content, &report, FixSafety::Safe);
    assert_eq!(fixed_bytes, "FROM alpine:3.18\nCOPY src/ /app/\n");

    // archives are what ADD is for; no violation there
    let archive = lint("FROM alpine:3.18\nADD rootfs.tar.gz /\n");
    assert!(with_code(&archive, "hadolint/DL3020").is_empty());
}

#[test]
fn pipeline_runs_are_identical() {
    let content = indoc! {r#"
        FROM ubuntu
        RUN apt install python
        RUN cd /srv
        MAINTAINER someone
    "#};
    let first = lint(content);
    let second = lint(content);

    let describe = |r: &FileReport| {
        r.violations
            .iter()
            .map(|v| (v.code.clone(), v.range.start_line, v.range.start_col))
            .collect::<Vec<_>>()
    };
    assert_eq!(describe(&first), describe(&second));
}

#[test]
fn undefined_variable_gets_a_suggestion() {
    let content = indoc! {r#"
        FROM alpine:3.18
        ENV APP_VERSION=1.2.3
        RUN echo $APP_VERSON
    "#};
    let report = lint(content);
    let found = with_code(&report, "buildkit/UndefinedVar");
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("APP_VERSON"));
    assert!(found[0].detail.as_deref().unwrap().contains("APP_VERSION"));
}
