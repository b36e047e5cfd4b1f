//! Thin adaptor over the `dockerfile-parser` crate.
//!
//! Owns pre-parse validation, the parsed AST, per-file line statistics, and
//! the span helpers rules use to anchor violations onto the original text.
//! The parser has no notion of `FROM --platform` or heredoc bodies; the
//! `--platform` flag is recovered from the raw FROM line here.

use std::path::Path;

use dockerfile_parser::{Dockerfile, FromInstruction, Instruction, RunInstruction, ShellOrExecExpr, Stages};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::source::SourceMap;
use crate::violations::TextRange;

/// Files larger than this are rejected before parsing.
pub const MAX_FILE_SIZE: usize = 1024 * 1024;

/// Why a file was rejected before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileValidationError {
    Empty,
    TooLarge { size: usize },
    Executable,
    NotUtf8,
}

impl std::fmt::Display for FileValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileValidationError::Empty => write!(f, "file is empty"),
            FileValidationError::TooLarge { size } => {
                write!(f, "file is {size} bytes, larger than the {MAX_FILE_SIZE} byte limit")
            }
            FileValidationError::Executable => {
                write!(f, "file has the executable bit set; Dockerfiles are not scripts")
            }
            FileValidationError::NotUtf8 => write!(f, "file is not valid UTF-8"),
        }
    }
}

/// Pre-parse validation: size bounds, executable bit, UTF-8.
pub fn validate_file(path: &Path, bytes: &[u8]) -> Result<String, FileValidationError> {
    if bytes.is_empty() {
        return Err(FileValidationError::Empty);
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(FileValidationError::TooLarge { size: bytes.len() });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
                return Err(FileValidationError::Executable);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }

    String::from_utf8(bytes.to_vec()).map_err(|_| FileValidationError::NotUtf8)
}

/// A parsed Dockerfile plus the statistics the pipeline reports.
#[derive(Debug)]
pub struct ParseResult {
    pub ast: Dockerfile,
    pub total_lines: usize,
    pub blank_lines: usize,
    pub comment_lines: usize,
}

impl ParseResult {
    /// Parses the content backing `map`. Adaptor failures carry the
    /// adaptor's own message.
    pub fn parse(map: &SourceMap) -> Result<ParseResult, dockerfile_parser::Error> {
        let ast = Dockerfile::parse(map.content())?;

        let mut blank_lines = 0;
        let mut comment_lines = 0;
        for i in 0..map.line_count() {
            let line = map.line(i).trim();
            if line.is_empty() {
                blank_lines += 1;
            } else if line.starts_with('#') {
                comment_lines += 1;
            }
        }

        Ok(ParseResult {
            ast,
            total_lines: map.line_count(),
            blank_lines,
            comment_lines,
        })
    }

    /// The build stages, in source order.
    pub fn stages(&self) -> Stages<'_> {
        self.ast.stages()
    }

    /// ARG instructions preceding the first FROM.
    pub fn global_args(&self) -> &[dockerfile_parser::ArgInstruction] {
        &self.ast.global_args
    }
}

/// Byte span `(start, end)` of any instruction.
pub fn instruction_span(ins: &Instruction) -> (usize, usize) {
    let span = match ins {
        Instruction::From(i) => &i.span,
        Instruction::Arg(i) => &i.span,
        Instruction::Label(i) => &i.span,
        Instruction::Run(i) => &i.span,
        Instruction::Entrypoint(i) => &i.span,
        Instruction::Cmd(i) => &i.span,
        Instruction::Copy(i) => &i.span,
        Instruction::Env(i) => &i.span,
        Instruction::Misc(i) => &i.span,
    };
    (span.start, span.end)
}

/// Uppercase keyword of an instruction (`FROM`, `RUN`, `HEALTHCHECK`, …).
pub fn instruction_kind(ins: &Instruction) -> String {
    match ins {
        Instruction::From(_) => "FROM".to_string(),
        Instruction::Arg(_) => "ARG".to_string(),
        Instruction::Label(_) => "LABEL".to_string(),
        Instruction::Run(_) => "RUN".to_string(),
        Instruction::Entrypoint(_) => "ENTRYPOINT".to_string(),
        Instruction::Cmd(_) => "CMD".to_string(),
        Instruction::Copy(_) => "COPY".to_string(),
        Instruction::Env(_) => "ENV".to_string(),
        Instruction::Misc(m) => m.instruction.content.to_uppercase(),
    }
}

/// Converts a byte span into a [`TextRange`] (1-based lines, 0-based cols).
pub fn range_for_span(map: &SourceMap, start: usize, end: usize) -> TextRange {
    let (start_line, start_col) = map.position(start);
    let (end_line, end_col) = map.position(end);
    TextRange::new(start_line + 1, start_col, end_line + 1, end_col)
}

/// 0-based line of a byte offset.
pub fn line_of(map: &SourceMap, offset: usize) -> usize {
    map.position(offset).0
}

/// A shell-form RUN script as raw text, anchored in the original file.
#[derive(Debug, Clone)]
pub struct ScriptRef {
    /// Raw script text, line continuations and all.
    pub text: String,
    /// 0-based file line where the script begins.
    pub start_line: usize,
    /// 0-based column on that line.
    pub start_col: usize,
    /// Byte span of the script in the original content.
    pub span: (usize, usize),
}

impl ScriptRef {
    /// Maps a script-relative `(line, col)` onto 0-based file coordinates.
    pub fn file_position(&self, line: usize, col: usize) -> (usize, usize) {
        if line == 0 {
            (self.start_line, self.start_col + col)
        } else {
            (self.start_line + line, col)
        }
    }
}

/// Extracts the raw script of a shell-form RUN. Exec-form RUNs have no
/// script to lex and return `None`.
pub fn run_script(run: &RunInstruction, map: &SourceMap) -> Option<ScriptRef> {
    let expr = match &run.expr {
        ShellOrExecExpr::Shell(breakable) => breakable,
        ShellOrExecExpr::Exec(_) => return None,
    };
    let (start, end) = (expr.span.start, expr.span.end);
    let text = map.content().get(start..end)?.to_string();
    let (start_line, start_col) = map.position(start);
    Some(ScriptRef { text, start_line, start_col, span: (start, end) })
}

static PLATFORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)--platform=(\S+)").unwrap());

/// Recovers `--platform=…` from the raw FROM line; the adaptor itself does
/// not surface the flag.
pub fn from_platform(from: &FromInstruction, map: &SourceMap) -> Option<String> {
    let line = map.line(line_of(map, from.span.start));
    PLATFORM_RE
        .captures(line)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_parse_counts_lines() {
        let map = SourceMap::new(indoc! {r#"
            # builder image
            FROM alpine:3.18

            RUN echo hi
        "#});
        let result = ParseResult::parse(&map).unwrap();
        assert_eq!(result.total_lines, 4);
        assert_eq!(result.blank_lines, 1);
        assert_eq!(result.comment_lines, 1);
        assert_eq!(result.stages().stages.len(), 1);
    }

    #[test]
    fn test_global_args() {
        let map = SourceMap::new("ARG VERSION=3.18\nFROM alpine:${VERSION}\n");
        let result = ParseResult::parse(&map).unwrap();
        assert_eq!(result.global_args().len(), 1);
        assert_eq!(result.global_args()[0].name.content, "VERSION");
    }

    #[test]
    fn test_run_script_extraction() {
        let map = SourceMap::new("FROM alpine\nRUN apt-get update && \\\n    apt-get install -y curl\n");
        let result = ParseResult::parse(&map).unwrap();
        let run = result
            .ast
            .instructions
            .iter()
            .find_map(|ins| match ins {
                Instruction::Run(r) => Some(r),
                _ => None,
            })
            .unwrap();
        let script = run_script(run, &map).unwrap();
        assert!(script.text.starts_with("apt-get update"));
        assert!(script.text.contains("install -y curl"));
        assert_eq!(script.start_line, 1);
        assert_eq!(script.start_col, 4);
        // script-relative (1, 4) is file line 2
        assert_eq!(script.file_position(1, 4), (2, 4));
    }

    #[test]
    fn test_instruction_kind_misc() {
        let map = SourceMap::new("FROM alpine\nMAINTAINER someone\n");
        let result = ParseResult::parse(&map).unwrap();
        let kinds: Vec<String> = result.ast.instructions.iter().map(instruction_kind).collect();
        assert_eq!(kinds, ["FROM", "MAINTAINER"]);
    }

    #[test]
    fn test_validate_file_bounds() {
        let path = Path::new("Dockerfile");
        assert_eq!(validate_file(path, b""), Err(FileValidationError::Empty));
        assert!(validate_file(path, b"FROM alpine\n").is_ok());
        assert_eq!(
            validate_file(path, &[0xff, 0xfe, 0x00]),
            Err(FileValidationError::NotUtf8)
        );
    }

    #[test]
    fn test_range_for_span() {
        let map = SourceMap::new("FROM alpine\nRUN echo\n");
        let range = range_for_span(&map, 12, 20);
        assert_eq!(range, TextRange::new(2, 0, 2, 8));
    }
}
