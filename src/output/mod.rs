//! Output formatters over lint reports.
//!
//! Every formatter is a pure `&[FileReport] → String` function; the
//! dispatcher prints the result. Keeping rendering pure keeps the formats
//! testable without capturing stdout.

mod github;
mod json;
mod markdown;
mod sarif;
mod text;

use crate::config::OutputFormat;
use crate::pipeline::FileReport;

pub use github::render_github;
pub use json::render_json;
pub use markdown::render_markdown;
pub use sarif::render_sarif;
pub use text::{fix_summary, render_text};

/// Renders reports in the requested format.
pub fn render(reports: &[FileReport], format: OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Text => render_text(reports, color),
        OutputFormat::Json => render_json(reports),
        OutputFormat::Sarif => render_sarif(reports),
        OutputFormat::Github => render_github(reports),
        OutputFormat::Markdown => render_markdown(reports),
    }
}

/// Prints the rendered output to stdout.
pub fn print(reports: &[FileReport], format: OutputFormat, color: bool) {
    let rendered = render(reports, format, color);
    if !rendered.is_empty() {
        println!("{rendered}");
    }
}
