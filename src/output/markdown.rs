//! Markdown table output, for pasting into issues and PR descriptions.

use crate::pipeline::FileReport;

pub fn render_markdown(reports: &[FileReport]) -> String {
    let total: usize = reports.iter().map(|r| r.violations.len()).sum();
    if total == 0 {
        return "No issues found.".to_string();
    }

    let mut out = String::from("| File | Line | Severity | Rule | Message |\n");
    out.push_str("|---|---|---|---|---|\n");
    for report in reports {
        for violation in &report.violations {
            let rule = match &violation.doc_url {
                Some(url) => format!("[{}]({url})", violation.code),
                None => violation.code.clone(),
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                report.path.display(),
                violation.range.start_line,
                violation.severity,
                rule,
                violation.message.replace('|', "\\|"),
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
    fn test_markdown_table() {
        let report = lint_bytes(
            Path::new("Dockerfile"),
            b"FROM ubuntu\nMAINTAINER me\n",
            &Config::default(),
        );
        let rendered = render_markdown(&[report]);
        assert!(rendered.starts_with("| File | Line |"));
        assert!(rendered.contains("| Dockerfile | 2 |"));
    }

    #[test]
    fn test_markdown_clean() {
        let report = lint_bytes(Path::new("Dockerfile"), b"FROM alpine:3.18\n", &Config::default());
        assert_eq!(render_markdown(&[report]), "No issues found.");
    }
}
