//! The violation and fix data model shared by rules, the pipeline, the fix
//! planner, and the output formatters.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Effective severity of a violation. `Off` disables a rule entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Off,
    Style,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Off => "off",
            Severity::Style => "style",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Severity::Off),
            "style" => Ok(Severity::Style),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity `{other}`")),
        }
    }
}

/// A source range: 1-based lines, 0-based columns, end column exclusive.
///
/// A zero-width range (`start == end`) models a pure insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl TextRange {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        TextRange { start_line, start_col, end_line, end_col }
    }

    /// A range covering `[start_col, end_col)` on a single line.
    pub fn on_line(line: usize, start_col: usize, end_col: usize) -> Self {
        TextRange::new(line, start_col, line, end_col)
    }

    /// A zero-width insertion point.
    pub fn at(line: usize, col: usize) -> Self {
        TextRange::new(line, col, line, col)
    }
}

/// One replacement of a source range with new text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub file: PathBuf,
    pub range: TextRange,
    pub replacement: String,
}

/// How confident a fix is; the planner only applies fixes at or below the
/// configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSafety {
    /// Behavior-preserving by construction.
    Safe,
    /// Very likely correct, but worth a human glance.
    Suggestion,
    /// May change behavior; apply only on request.
    Unsafe,
}

/// Deferred-resolution handle: the planner calls the resolver registered
/// under `id` with the current modified content and `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverRef {
    pub id: String,
    pub data: serde_json::Value,
}

/// A machine-applicable fix attached to a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub description: String,
    /// Concrete edits; empty when `resolver` is set.
    pub edits: Vec<TextEdit>,
    pub safety: FixSafety,
    /// Marks the fix a formatter should surface first.
    pub is_preferred: bool,
    /// Set when the edits must be recomputed against modified content.
    pub resolver: Option<ResolverRef>,
    /// Lower priorities apply first: content edits at 0, structural
    /// transforms in the high 90s.
    pub priority: i32,
}

impl SuggestedFix {
    pub fn new(description: impl Into<String>, edits: Vec<TextEdit>, safety: FixSafety) -> Self {
        SuggestedFix {
            description: description.into(),
            edits,
            safety,
            is_preferred: false,
            resolver: None,
            priority: 0,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.is_preferred = true;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn deferred(
        description: impl Into<String>,
        safety: FixSafety,
        id: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        SuggestedFix {
            description: description.into(),
            edits: Vec::new(),
            safety,
            is_preferred: false,
            resolver: Some(ResolverRef { id: id.into(), data }),
            priority: 0,
        }
    }

    pub fn needs_resolve(&self) -> bool {
        self.resolver.is_some()
    }
}

/// Stage index of a violation; `FILE_LEVEL` for violations that are not tied
/// to any stage.
pub const FILE_LEVEL: i32 = -1;

/// One diagnostic produced by a rule or by the semantic builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub file: PathBuf,
    pub range: TextRange,
    /// Namespaced rule code (`tally/*`, `hadolint/*`, `buildkit/*`).
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub severity: Severity,
    pub doc_url: Option<String>,
    /// Offending source line(s), when a formatter wants to show them.
    pub snippet: Option<String>,
    pub fix: Option<SuggestedFix>,
    /// 0-based stage index, or [`FILE_LEVEL`].
    pub stage: i32,
}

impl Violation {
    pub fn new(
        file: impl Into<PathBuf>,
        range: TextRange,
        code: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Violation {
            file: file.into(),
            range,
            code: code.into(),
            message: message.into(),
            detail: None,
            severity,
            doc_url: None,
            snippet: None,
            fix: None,
            stage: FILE_LEVEL,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_doc_url(mut self, url: impl Into<String>) -> Self {
        self.doc_url = Some(url.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn in_stage(mut self, stage: usize) -> Self {
        self.stage = stage as i32;
        self
    }
}
