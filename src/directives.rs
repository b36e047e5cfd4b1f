//! Inline suppression directives.
//!
//! Three grammars are recognized in comments, keyword matching
//! case-insensitive, `;reason=…` optional on all of them:
//!
//! ```text
//! # tally [global] ignore=RULE1,RULE2[;reason=…]
//! # hadolint [global] ignore=RULE1,RULE2[;reason=…]
//! # check=skip=RULE1,RULE2[;reason=…]        (always file-global)
//! ```
//!
//! Without `global`, a directive binds to the next non-empty non-comment
//! line. The rule name `all` matches every rule. A shell directive
//! (`# hadolint shell=…`) is parsed here too; it configures the semantic
//! builder rather than suppressing anything.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::source::SourceMap;

/// Which grammar produced a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Tally,
    Hadolint,
    /// `check=skip=` (buildx compatibility); always global.
    Buildx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveScope {
    NextLine,
    Global,
}

/// A parsed suppression directive.
#[derive(Debug, Clone)]
pub struct InlineDirective {
    pub kind: DirectiveKind,
    pub scope: DirectiveScope,
    /// Rule codes, whitespace-trimmed; `all` matches everything.
    pub rules: Vec<String>,
    pub reason: Option<String>,
    /// Original comment text (without the `#`).
    pub raw: String,
    /// 0-based line of the comment.
    pub line: usize,
    /// 0-based line a `NextLine` directive binds to, if one exists.
    pub target_line: Option<usize>,
}

impl InlineDirective {
    /// Whether this directive names `code`, either fully qualified or by
    /// its bare name (`DL3003` matches `hadolint/DL3003`).
    pub fn matches_rule(&self, code: &str) -> bool {
        let bare = code.rsplit('/').next().unwrap_or(code);
        self.rules.iter().any(|r| {
            r.eq_ignore_ascii_case("all")
                || r.eq_ignore_ascii_case(code)
                || r.eq_ignore_ascii_case(bare)
        })
    }

    /// Whether a violation of `code` on 0-based `line` is suppressed.
    pub fn suppresses(&self, code: &str, line: usize) -> bool {
        if !self.matches_rule(code) {
            return false;
        }
        match self.scope {
            DirectiveScope::Global => true,
            DirectiveScope::NextLine => self.target_line == Some(line),
        }
    }
}

/// A `shell=` directive overriding the stage shell for following stages.
#[derive(Debug, Clone)]
pub struct ShellDirective {
    /// 0-based line of the comment.
    pub line: usize,
    pub argv: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DirectiveParseError {
    /// 0-based line of the offending comment.
    pub line: usize,
    pub message: String,
}

/// Everything extracted from a file's comments.
#[derive(Debug, Default)]
pub struct DirectiveParseResult {
    pub directives: Vec<InlineDirective>,
    pub shell_directives: Vec<ShellDirective>,
    pub errors: Vec<DirectiveParseError>,
}

static IGNORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(tally|hadolint)\s+(global\s+)?ignore\s*=\s*([^;]+?)\s*(?:;\s*reason\s*=\s*(.*\S))?\s*$",
    )
    .unwrap()
});

static SKIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*check\s*=\s*skip\s*=\s*([^;]+?)\s*(?:;\s*reason\s*=\s*(.*\S))?\s*$")
        .unwrap()
});

static SHELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:tally|hadolint)\s+shell\s*=\s*(\S.*?)\s*$").unwrap());

/// Parses all inline directives in a file.
///
/// `validator` may reject unknown rule codes; rejected codes become parse
/// errors but the directive is still returned without them, so suppression
/// degrades gracefully.
pub fn parse_directives(
    map: &SourceMap,
    validator: Option<&dyn Fn(&str) -> bool>,
) -> DirectiveParseResult {
    let mut result = DirectiveParseResult::default();

    for comment in map.comments() {
        if let Some(caps) = SHELL_RE.captures(&comment.text) {
            let argv = caps[1].split_whitespace().map(str::to_string).collect();
            result.shell_directives.push(ShellDirective { line: comment.line, argv });
            continue;
        }

        let parsed = if let Some(caps) = IGNORE_RE.captures(&comment.text) {
            let kind = if caps[1].eq_ignore_ascii_case("tally") {
                DirectiveKind::Tally
            } else {
                DirectiveKind::Hadolint
            };
            let scope = if caps.get(2).is_some() {
                DirectiveScope::Global
            } else {
                DirectiveScope::NextLine
            };
            Some((kind, scope, caps[3].to_string(), caps.get(4).map(|m| m.as_str().to_string())))
        } else if let Some(caps) = SKIP_RE.captures(&comment.text) {
            Some((
                DirectiveKind::Buildx,
                DirectiveScope::Global,
                caps[1].to_string(),
                caps.get(2).map(|m| m.as_str().to_string()),
            ))
        } else {
            None
        };

        let Some((kind, scope, rule_list, reason)) = parsed else {
            continue;
        };

        let mut rules = Vec::new();
        for rule in rule_list.split(',') {
            let rule = rule.trim();
            if rule.is_empty() {
                continue;
            }
            if !is_valid_rule_name(rule) {
                result.errors.push(DirectiveParseError {
                    line: comment.line,
                    message: format!("malformed rule name `{rule}` in directive"),
                });
                continue;
            }
            if let Some(validate) = validator {
                if !rule.eq_ignore_ascii_case("all") && !validate(rule) {
                    result.errors.push(DirectiveParseError {
                        line: comment.line,
                        message: format!("unknown rule code `{rule}` in directive"),
                    });
                    continue;
                }
            }
            rules.push(rule.to_string());
        }

        if rules.is_empty() {
            result.errors.push(DirectiveParseError {
                line: comment.line,
                message: "directive suppresses no valid rules".to_string(),
            });
            continue;
        }

        let target_line = match scope {
            DirectiveScope::Global => None,
            DirectiveScope::NextLine => next_target_line(map, comment.line),
        };

        result.directives.push(InlineDirective {
            kind,
            scope,
            rules,
            reason,
            raw: comment.text.clone(),
            line: comment.line,
            target_line,
        });
    }

    result
}

/// First non-empty non-comment line after `line`, if any.
fn next_target_line(map: &SourceMap, line: usize) -> Option<usize> {
    ((line + 1)..map.line_count()).find(|&i| {
        let text = map.line(i).trim();
        !text.is_empty() && !text.starts_with('#')
    })
}

fn is_valid_rule_name(rule: &str) -> bool {
    !rule.is_empty()
        && rule
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '*'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> DirectiveParseResult {
        parse_directives(&SourceMap::new(content), None)
    }

    #[test]
    fn test_tally_next_line() {
        let result = parse(
            "FROM alpine\n\
             # tally ignore=hadolint/DL3003,hadolint/DL3027\n\
             RUN cd /opt\n",
        );
        assert_eq!(result.directives.len(), 1);
        let d = &result.directives[0];
        assert_eq!(d.kind, DirectiveKind::Tally);
        assert_eq!(d.scope, DirectiveScope::NextLine);
        assert_eq!(d.rules, ["hadolint/DL3003", "hadolint/DL3027"]);
        assert_eq!(d.target_line, Some(2));
        assert!(d.suppresses("hadolint/DL3003", 2));
        assert!(!d.suppresses("hadolint/DL3003", 3));
        assert!(!d.suppresses("hadolint/DL3006", 2));
    }

    #[test]
    fn test_hadolint_global_with_reason() {
        let result = parse("# hadolint global ignore=DL3003 ; reason=legacy build\nFROM x\n");
        let d = &result.directives[0];
        assert_eq!(d.kind, DirectiveKind::Hadolint);
        assert_eq!(d.scope, DirectiveScope::Global);
        assert_eq!(d.reason.as_deref(), Some("legacy build"));
        // bare hadolint code matches the namespaced violation anywhere
        assert!(d.suppresses("hadolint/DL3003", 40));
    }

    #[test]
    fn test_check_skip_is_always_global() {
        let result = parse("# check=skip=DL3006,DL3027\nFROM x\n");
        let d = &result.directives[0];
        assert_eq!(d.kind, DirectiveKind::Buildx);
        assert_eq!(d.scope, DirectiveScope::Global);
        assert_eq!(d.rules, ["DL3006", "DL3027"]);
    }

    #[test]
    fn test_all_matches_every_rule() {
        let result = parse("# tally global ignore=all\n");
        assert!(result.directives[0].suppresses("tally/anything", 7));
    }

    #[test]
    fn test_next_line_skips_comments_and_blanks() {
        let result = parse(
            "# tally ignore=DL3000\n\
             # another comment\n\
             \n\
             RUN true\n",
        );
        assert_eq!(result.directives[0].target_line, Some(3));
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let result = parse("# TALLY GLOBAL IGNORE=all\n# Hadolint Ignore=DL3000\nRUN x\n");
        assert_eq!(result.directives.len(), 2);
        assert_eq!(result.directives[0].scope, DirectiveScope::Global);
        assert_eq!(result.directives[1].scope, DirectiveScope::NextLine);
    }

    #[test]
    fn test_validator_rejects_unknown_codes() {
        let known = |code: &str| code == "hadolint/DL3003";
        let map = SourceMap::new("# tally ignore=hadolint/DL3003,bogus/XX\nRUN x\n");
        let result = parse_directives(&map, Some(&known));
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.directives[0].rules, ["hadolint/DL3003"]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("bogus/XX"));
    }

    #[test]
    fn test_whitespace_around_commas() {
        let result = parse("# tally ignore= DL3003 , DL3004 \nRUN x\n");
        assert_eq!(result.directives[0].rules, ["DL3003", "DL3004"]);
    }

    #[test]
    fn test_shell_directive() {
        let result = parse("# hadolint shell=powershell -command\nFROM x\n");
        assert_eq!(result.shell_directives.len(), 1);
        assert_eq!(result.shell_directives[0].argv, ["powershell", "-command"]);
        assert!(result.directives.is_empty());
    }

    #[test]
    fn test_plain_comment_is_not_a_directive() {
        let result = parse("# ignore this file\n# tallyho ignore=x\n");
        assert!(result.directives.is_empty());
        assert!(result.errors.is_empty());
    }
}
