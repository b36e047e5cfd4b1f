//! Source text bookkeeping for a single Dockerfile.
//!
//! The [`SourceMap`] owns the original bytes of a file and maps between byte
//! offsets, 0-based line indices, and 0-based columns. Everything downstream
//! (the semantic builder, rules, the fix planner) borrows it read-only.
//! Violations report 1-based lines; the `+1` happens where violations are
//! built, never here.

/// A comment line extracted from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// 0-based line index of the comment.
    pub line: usize,
    /// Trimmed comment text, without the leading `#`.
    pub text: String,
    /// Whether the text matches an inline-directive grammar or a parser
    /// pragma (`syntax=`, `escape=`).
    pub is_directive: bool,
}

/// Owns the original bytes of one file and indexes its line structure.
#[derive(Debug, Clone)]
pub struct SourceMap {
    content: String,
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Builds a map by scanning the content once for line starts.
    ///
    /// Both `\n` and `\r\n` line endings are handled; `\r` is stripped only
    /// from returned line text, never from the stored offsets.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut line_starts = Vec::new();

        if !content.is_empty() {
            line_starts.push(0);
            for (i, b) in content.bytes().enumerate() {
                if b == b'\n' && i + 1 < content.len() {
                    line_starts.push(i + 1);
                }
            }
        }

        SourceMap { content, line_starts }
    }

    /// The original content, untouched.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of 0-based line `i`, or `None` out of range.
    pub fn line_offset(&self, i: usize) -> Option<usize> {
        self.line_starts.get(i).copied()
    }

    /// Text of 0-based line `i` without the trailing newline or `\r`.
    ///
    /// Out-of-range indices return an empty string.
    pub fn line(&self, i: usize) -> &str {
        let Some(&start) = self.line_starts.get(i) else {
            return "";
        };
        let end = self
            .line_starts
            .get(i + 1)
            .map(|&next| next - 1)
            .unwrap_or_else(|| self.content.len());
        self.content[start..end].trim_end_matches(['\n', '\r'])
    }

    /// Inclusive line range `[start_line, end_line]` as raw text.
    ///
    /// The range clamps to the file bounds; an inverted or out-of-range
    /// start returns an empty string.
    pub fn snippet(&self, start_line: usize, end_line: usize) -> String {
        if start_line > end_line || start_line >= self.line_count() {
            return String::new();
        }
        let end_line = end_line.min(self.line_count().saturating_sub(1));
        (start_line..=end_line)
            .map(|i| self.line(i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lines around `line`, `before` lines of leading and `after` lines of
    /// trailing context.
    pub fn snippet_around(&self, line: usize, before: usize, after: usize) -> String {
        self.snippet(line.saturating_sub(before), line.saturating_add(after))
    }

    /// Maps a byte offset to `(line, column)`, both 0-based. Offsets past the
    /// end of the content clamp to the final position.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        if self.line_starts.is_empty() {
            return (0, 0);
        }
        let offset = offset.min(self.content.len());
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        (line, offset - self.line_starts[line])
    }

    /// Maps a 0-based `(line, column)` back to a byte offset. Columns may
    /// point one past the end of the line (a pure-insertion position).
    pub fn offset_of(&self, line: usize, column: usize) -> Option<usize> {
        let start = self.line_offset(line)?;
        let line_len = self.line(line).len();
        // allow addressing the newline itself for end-of-line insertions
        if column > line_len + 1 {
            return None;
        }
        Some((start + column).min(self.content.len()))
    }

    /// All comment lines in the file, in source order.
    ///
    /// A line is a comment when its first non-whitespace character is `#`.
    pub fn comments(&self) -> Vec<Comment> {
        (0..self.line_count())
            .filter_map(|i| {
                let trimmed = self.line(i).trim_start();
                let text = trimmed.strip_prefix('#')?.trim().to_string();
                let is_directive = is_directive_text(&text);
                Some(Comment { line: i, text, is_directive })
            })
            .collect()
    }

    /// The contiguous run of comment lines immediately preceding 0-based
    /// line `n`, broken by any empty or non-comment line.
    pub fn comments_for_line(&self, n: usize) -> Vec<Comment> {
        let mut run = Vec::new();
        let mut i = n;
        while i > 0 {
            i -= 1;
            let trimmed = self.line(i).trim_start();
            match trimmed.strip_prefix('#') {
                Some(rest) => {
                    let text = rest.trim().to_string();
                    let is_directive = is_directive_text(&text);
                    run.push(Comment { line: i, text, is_directive });
                }
                None => break,
            }
        }
        run.reverse();
        run
    }
}

/// Case-insensitive keyword prefix match, returning the remainder.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if text.len() >= keyword.len() && text[..keyword.len()].eq_ignore_ascii_case(keyword) {
        Some(&text[keyword.len()..])
    } else {
        None
    }
}

/// Whether comment text (sans `#`) is an inline directive or parser pragma.
fn is_directive_text(text: &str) -> bool {
    let text = text.trim_start();

    for tool in ["tally", "hadolint"] {
        let Some(rest) = strip_keyword(text, tool) else {
            continue;
        };
        if !rest.starts_with([' ', '\t']) {
            continue;
        }
        let rest = rest.trim_start();
        let rest = match strip_keyword(rest, "global") {
            Some(after) if after.starts_with([' ', '\t']) => after.trim_start(),
            _ => rest,
        };
        if strip_keyword(rest, "ignore").is_some_and(|r| r.trim_start().starts_with('='))
            || strip_keyword(rest, "shell").is_some_and(|r| r.trim_start().starts_with('='))
        {
            return true;
        }
    }

    if let Some(rest) = strip_keyword(text, "check") {
        let rest = rest.trim_start();
        if let Some(rest) = rest.strip_prefix('=') {
            if strip_keyword(rest.trim_start(), "skip")
                .is_some_and(|r| r.trim_start().starts_with('='))
            {
                return true;
            }
        }
    }

    strip_keyword(text, "syntax=").is_some() || strip_keyword(text, "escape=").is_some()
}
