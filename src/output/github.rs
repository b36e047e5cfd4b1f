//! GitHub Actions workflow-command output.
//!
//! One `::error`/`::warning`/`::notice` line per violation; the runner
//! attaches them to the right file and line in the PR view.

use crate::pipeline::FileReport;
use crate::violations::Severity;

fn command(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info | Severity::Style | Severity::Off => "notice",
    }
}

/// Workflow commands choke on raw newlines and percent signs.
fn escape(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn render_github(reports: &[FileReport]) -> String {
    let mut out = String::new();
    for report in reports {
        for violation in &report.violations {
            out.push_str(&format!(
                "::{} file={},line={},endLine={},title={}::{}\n",
                command(violation.severity),
                report.path.display(),
                violation.range.start_line,
                violation.range.end_line,
                violation.code,
                escape(&violation.message),
            ));
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::lint_bytes;
    use std::path::Path;

    #[test]
    fn test_workflow_command_lines() {
        let report = lint_bytes(
            Path::new("Dockerfile"),
            b"FROM ubuntu\nMAINTAINER me\n",
            &Config::default(),
        );
        let rendered = render_github(&[report]);
        assert!(rendered
            .lines()
            .any(|l| l.starts_with("::warning file=Dockerfile,line=2,")));
        assert!(rendered.contains("title=buildkit/MaintainerDeprecated"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape("a\nb%c"), "a%0Ab%25c");
    }
}
