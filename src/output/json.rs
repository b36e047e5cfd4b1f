//! Machine-readable JSON output.

use serde::Serialize;

use crate::pipeline::FileReport;
use crate::violations::Violation;

#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    total_lines: usize,
    blank_lines: usize,
    comment_lines: usize,
    parse_failed: bool,
    violations: &'a [Violation],
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: Vec<JsonFile<'a>>,
    total_violations: usize,
}

pub fn render_json(reports: &[FileReport]) -> String {
    let files: Vec<JsonFile> = reports
        .iter()
        .map(|r| JsonFile {
            path: r.path.display().to_string(),
            total_lines: r.total_lines,
            blank_lines: r.blank_lines,
            comment_lines: r.comment_lines,
            parse_failed: r.parse_failed,
            violations: &r.violations,
        })
        .collect();
    let report = JsonReport {
        total_violations: files.iter().map(|f| f.violations.len()).sum(),
        files,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}
