//! Command discovery over tokenized RUN scripts.
//!
//! Rules never execute anything; they ask these helpers where commands sit
//! inside a script. All reported positions are relative to the script text
//! the caller passed in. A command is only ever detected in head position,
//! so `apt-get install sudo` does not count as a `sudo` invocation.

use itertools::Itertools;

use super::lexer::{tokenize, Token, TokenKind};
use super::variant::ShellVariant;

/// Wrappers that defer to another command; the head behind them is the one
/// that gets reported.
const TRANSPARENT_WRAPPERS: &[&str] = &["env", "nice", "timeout"];

/// A command found in head position within a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command name as written (quotes removed, path intact).
    pub name: String,
    /// First positional argument, if any (`install` in `apt-get install`).
    pub subcommand: Option<String>,
    /// All arguments after the name, flags included, in order.
    pub args: Vec<String>,
    /// 0-based line of the name within the script.
    pub line: usize,
    /// 0-based column of the name on its line.
    pub col: usize,
    /// 0-based column just past the name on its line.
    pub end_col: usize,
}

impl CommandInfo {
    /// The command's basename, for matching `/usr/bin/apt-get` as `apt-get`.
    pub fn basename(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// One `&&`/`||`/`;`-separated segment of a script.
#[derive(Debug, Clone)]
pub struct ChainSegment {
    /// Raw text of the segment, whitespace-trimmed.
    pub text: String,
    /// The separator *before* this segment (`None` for the first, and for
    /// segments introduced by pipes, subshells, or newlines).
    pub leading_separator: Option<String>,
    /// The segment's tokens, positions relative to the whole script.
    tokens: Vec<Token>,
}

impl ChainSegment {
    /// Head command of the segment after wrapper stripping, if one exists.
    pub fn command(&self) -> Option<CommandInfo> {
        segment_head(&self.tokens)
    }
}

/// Result of pulling one command out of a chain.
#[derive(Debug, Clone)]
pub struct ChainMatch {
    /// The command that satisfied the predicate.
    pub command: CommandInfo,
    /// Raw script text before the matched segment, separators preserved.
    pub preceding: String,
    /// Raw script text after the matched segment, separators preserved.
    pub remaining: String,
    /// Whether anything besides the matched command exists in the script.
    pub has_other_statements: bool,
}

/// Finds every head-position command whose basename matches one of `names`.
///
/// Transparent wrappers (`env`, `nice`, `timeout`, `sh -c`, `bash -c`) are
/// looked through; for the `-c` forms the quoted body is scanned
/// recursively. Non-POSIX variants yield nothing.
pub fn find_commands(script: &str, variant: ShellVariant, names: &[&str]) -> Vec<CommandInfo> {
    if variant.is_non_posix() {
        return Vec::new();
    }
    let mut found = Vec::new();
    for segment in split_segments(&tokenize(script), script) {
        collect_from_segment(&segment, names, &mut found);
    }
    found
}

pub fn contains_command(script: &str, name: &str) -> bool {
    contains_command_with_variant(script, ShellVariant::Posix, name)
}

pub fn contains_command_with_variant(script: &str, variant: ShellVariant, name: &str) -> bool {
    !find_commands(script, variant, &[name]).is_empty()
}

/// Splits the script into chain segments with separators preserved.
pub fn extract_chained_commands(script: &str, variant: ShellVariant) -> Vec<String> {
    if variant.is_non_posix() {
        return Vec::new();
    }
    split_segments(&tokenize(script), script)
        .into_iter()
        .map(|s| s.text)
        .collect()
}

/// The first `n` separators between chain segments (`&&`, `||`, `;`).
pub fn extract_chain_separators(script: &str, variant: ShellVariant, n: usize) -> Vec<String> {
    if variant.is_non_posix() {
        return Vec::new();
    }
    split_segments(&tokenize(script), script)
        .into_iter()
        .skip(1)
        .filter_map(|s| s.leading_separator)
        .take(n)
        .collect()
}

/// Finds the first chain segment whose head command satisfies `predicate`
/// and returns it together with the text on either side.
pub fn find_command_in_chain(
    script: &str,
    variant: ShellVariant,
    predicate: impl Fn(&CommandInfo) -> bool,
) -> Option<ChainMatch> {
    if variant.is_non_posix() {
        return None;
    }
    let segments = split_segments(&tokenize(script), script);
    let (index, command) = segments.iter().enumerate().find_map(|(i, s)| {
        let cmd = s.command()?;
        predicate(&cmd).then_some((i, cmd))
    })?;

    let preceding = join_segments(&segments[..index]);
    let remaining = join_segments(&segments[index + 1..]);
    let has_other_statements = !preceding.is_empty() || !remaining.is_empty();

    Some(ChainMatch { command, preceding, remaining, has_other_statements })
}

/// Returns the run of commands in `remaining` up to (not including) the next
/// `cd`, rejoined with their original separators, plus the leftover text
/// from that `cd` onward.
pub fn extract_commands_between_cds(remaining: &str, variant: ShellVariant) -> (String, String) {
    if variant.is_non_posix() {
        return (remaining.trim().to_string(), String::new());
    }
    let segments = split_segments(&tokenize(remaining), remaining);
    let next_cd = segments
        .iter()
        .position(|s| s.command().is_some_and(|c| c.basename() == "cd"))
        .unwrap_or(segments.len());
    (
        join_segments(&segments[..next_cd]),
        join_segments(&segments[next_cd..]),
    )
}

/// Heuristic for scripts worth converting to heredoc form: a POSIX script
/// with at least `min_commands` segments chained exclusively by `&&`, and
/// no heredoc already present.
pub fn is_heredoc_candidate(script: &str, variant: ShellVariant, min_commands: usize) -> bool {
    if variant.is_non_posix() || script.contains("<<") {
        return false;
    }
    let segments = split_segments(&tokenize(script), script);
    if segments.len() < min_commands {
        return false;
    }
    segments
        .iter()
        .skip(1)
        .all(|s| s.leading_separator.as_deref() == Some("&&"))
}

/// Splits tokens into top-level chain segments. Pipes, subshell parens, and
/// newlines also end a segment so heads behind them stay visible, but only
/// `&&`/`||`/`;` are remembered as separators.
pub fn split_segments(tokens: &[Token], script: &str) -> Vec<ChainSegment> {
    let mut segments = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut pending_sep: Option<String> = None;

    for token in tokens {
        if token.is_separator() {
            let next_sep = match token.kind {
                TokenKind::And | TokenKind::Or | TokenKind::Semi => Some(token.text.clone()),
                _ => None,
            };
            flush_segment(script, &mut segments, &mut current, &mut pending_sep, next_sep);
        } else {
            current.push(token.clone());
        }
    }
    flush_segment(script, &mut segments, &mut current, &mut pending_sep, None);

    segments
}

fn flush_segment(
    script: &str,
    segments: &mut Vec<ChainSegment>,
    current: &mut Vec<Token>,
    pending_sep: &mut Option<String>,
    next_sep: Option<String>,
) {
    if !current.is_empty() {
        let start = current[0].start;
        let end = current[current.len() - 1].end;
        segments.push(ChainSegment {
            text: script[start..end].trim().to_string(),
            leading_separator: pending_sep.take(),
            tokens: std::mem::take(current),
        });
    }
    *pending_sep = next_sep;
}

fn join_segments(segments: &[ChainSegment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i == 0 {
                s.text.clone()
            } else {
                let sep = s.leading_separator.as_deref().unwrap_or(";");
                format!("{} {}", sep, s.text)
            }
        })
        .join(" ")
}

/// True for `KEY=VALUE` prefix assignments.
fn is_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !name.chars().next().unwrap().is_ascii_digit()
        }
        None => false,
    }
}

/// Word tokens of a segment with redirects (and their targets) removed.
fn head_words(tokens: &[Token]) -> Vec<&Token> {
    let mut words = Vec::new();
    let mut skip_next = false;
    for token in tokens {
        match token.kind {
            TokenKind::Redirect => skip_next = true,
            TokenKind::Word => {
                if skip_next {
                    skip_next = false;
                } else {
                    words.push(token);
                }
            }
            _ => {}
        }
    }
    words
}

/// Index of the effective head word after assignments and simple wrappers,
/// or `None` if the segment has no head.
fn strip_wrappers(words: &[&Token]) -> Option<usize> {
    let mut idx = 0;

    while idx < words.len() && !words[idx].quoted && is_assignment(&words[idx].text) {
        idx += 1;
    }

    loop {
        let head = words.get(idx)?;
        let basename = head.text.rsplit('/').next().unwrap_or(&head.text);

        if !TRANSPARENT_WRAPPERS.contains(&basename) {
            return Some(idx);
        }

        // nice and timeout may carry a bare numeric argument of their own
        let takes_numeric = matches!(basename, "nice" | "timeout");
        idx += 1;
        // wrapper flags and (for env) KEY=VALUE pairs
        while idx < words.len()
            && (words[idx].text.starts_with('-') || is_assignment(&words[idx].text))
        {
            idx += 1;
        }
        if takes_numeric
            && words
                .get(idx)
                .is_some_and(|w| w.text.starts_with(|c: char| c.is_ascii_digit()))
        {
            idx += 1;
        }
    }
}

/// Resolves the head command of one segment, looking through wrappers.
/// `sh -c`/`bash -c` segments report no head of their own.
fn segment_head(tokens: &[Token]) -> Option<CommandInfo> {
    let words = head_words(tokens);
    let idx = strip_wrappers(&words)?;
    let head = words[idx];
    let basename = head.text.rsplit('/').next().unwrap_or(&head.text);

    if matches!(basename, "sh" | "bash")
        && words.get(idx + 1).map(|w| w.text.as_str()) == Some("-c")
    {
        return None;
    }

    let args: Vec<String> = words[idx + 1..].iter().map(|w| w.text.clone()).collect();
    let subcommand = args.iter().find(|a| !a.starts_with('-')).cloned();

    Some(CommandInfo {
        name: head.text.clone(),
        subcommand,
        args,
        line: head.line,
        col: head.col,
        end_col: head.end_col,
    })
}

/// Scans one segment for matching commands, recursing into `sh -c`/`bash -c`
/// bodies with positions composed back onto the outer script.
fn collect_from_segment(segment: &ChainSegment, names: &[&str], found: &mut Vec<CommandInfo>) {
    let words = head_words(&segment.tokens);
    let Some(idx) = strip_wrappers(&words) else {
        return;
    };
    let head = words[idx];
    let basename = head.text.rsplit('/').next().unwrap_or(&head.text);

    if matches!(basename, "sh" | "bash")
        && words.get(idx + 1).map(|w| w.text.as_str()) == Some("-c")
    {
        if let Some(body) = words.get(idx + 2) {
            let quote_shift = usize::from(body.quoted);
            for inner in find_commands(&body.text, ShellVariant::Posix, names) {
                found.push(compose_positions(inner, body.line, body.col + quote_shift));
            }
        }
        return;
    }

    if names.iter().any(|n| *n == basename) {
        if let Some(cmd) = segment_head(&segment.tokens) {
            found.push(cmd);
        }
    }
}

/// Maps positions relative to a nested body onto the enclosing script, where
/// the body's first character sits at `(base_line, base_col)`.
fn compose_positions(mut cmd: CommandInfo, base_line: usize, base_col: usize) -> CommandInfo {
    if cmd.line == 0 {
        cmd.col += base_col;
        cmd.end_col += base_col;
    }
    cmd.line += base_line;
    cmd
}
