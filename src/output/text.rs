//! Human-oriented text output.

use console::style;
use itertools::Itertools;

use crate::pipeline::FileReport;
use crate::violations::Severity;

fn severity_label(severity: Severity, color: bool) -> String {
    if !color {
        return severity.to_string();
    }
    match severity {
        Severity::Error => style("error").red().bold().to_string(),
        Severity::Warning => style("warning").yellow().bold().to_string(),
        Severity::Info => style("info").cyan().to_string(),
        Severity::Style => style("style").dim().to_string(),
        Severity::Off => severity.to_string(),
    }
}

pub fn render_text(reports: &[FileReport], color: bool) -> String {
    let mut out = String::new();
    let mut total = 0usize;

    for report in reports {
        if report.violations.is_empty() {
            continue;
        }
        total += report.violations.len();

        for violation in &report.violations {
            out.push_str(&format!(
                "{}:{}:{} {} [{}] {}\n",
                report.path.display(),
                violation.range.start_line,
                violation.range.start_col,
                severity_label(violation.severity, color),
                violation.code,
                violation.message,
            ));
            if let Some(snippet) = &violation.snippet {
                if !snippet.is_empty() {
                    out.push_str(&format!("    {snippet}\n"));
                }
            }
            if let Some(detail) = &violation.detail {
                out.push_str(&format!("    {}\n", if color {
                    style(detail).dim().to_string()
                } else {
                    detail.clone()
                }));
            }
            if let Some(fix) = &violation.fix {
                let hint = format!("fix available: {}", fix.description);
                out.push_str(&format!("    {}\n", if color {
                    style(hint).green().to_string()
                } else {
                    hint
                }));
            }
        }
    }

    if total == 0 {
        let files = reports.len();
        out.push_str(&format!(
            "no issues found in {files} file{}\n",
            if files == 1 { "" } else { "s" }
        ));
    } else {
        let files = reports.iter().filter(|r| !r.violations.is_empty()).count();
        out.push_str(&format!(
            "\n{total} issue{} in {files} file{}\n",
            if total == 1 { "" } else { "s" },
            if files == 1 { "" } else { "s" }
        ));
    }

    out.trim_end().to_string()
}

/// One-line summary used by the CLI after `--fix` runs.
pub fn fix_summary(applied: usize, unapplied: usize) -> String {
    [
        (applied > 0).then(|| format!("applied {applied} fix{}", if applied == 1 { "" } else { "es" })),
        (unapplied > 0).then(|| format!("{unapplied} not applied")),
    ]
    .into_iter()
    .flatten()
    .join(", ")
}
