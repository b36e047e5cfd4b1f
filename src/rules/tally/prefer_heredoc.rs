//! `tally/prefer-heredoc`: long `&&` chains read better as heredoc scripts.
//!
//! The rewrite is deferred to a fix resolver: content-level fixes from other
//! rules apply first, then the resolver re-reads the modified RUN and builds
//! the heredoc form from whatever the script looks like by then.

use serde_json::json;

use crate::parse::range_for_span;
use crate::rules::hadolint::shell_runs;
use crate::rules::{LintInput, Rule, RuleCategory, RuleMetadata};
use crate::shell::is_heredoc_candidate;
use crate::violations::{FixSafety, Severity, SuggestedFix, Violation};

pub struct PreferHeredoc;

/// Priority band for structural transforms; content edits run first at 0.
pub const HEREDOC_FIX_PRIORITY: i32 = 97;

/// Resolver id the fix planner dispatches on.
pub const HEREDOC_RESOLVER_ID: &str = "heredoc-rewrite";

impl PreferHeredoc {
    fn min_commands(&self, input: &LintInput) -> usize {
        input
            .config
            .and_then(|c| c.get("min-commands"))
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(input.heredoc.min_commands)
    }
}

impl Rule for PreferHeredoc {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            fix_priority: HEREDOC_FIX_PRIORITY,
            ..RuleMetadata::new(
                "tally/prefer-heredoc",
                "prefer-heredoc",
                "Long command chains read better as heredoc scripts",
                Severity::Style,
                RuleCategory::Style,
            )
        }
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "min-commands": {
                    "type": "integer",
                    "minimum": 2,
                    "description": "chained commands required before suggesting a heredoc"
                }
            },
            "additionalProperties": false
        }))
    }

    fn default_config(&self) -> Option<serde_json::Value> {
        Some(json!({ "min-commands": 4 }))
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<(), String> {
        match config.get("min-commands") {
            None => Ok(()),
            Some(v) => match v.as_u64() {
                Some(n) if n >= 2 => Ok(()),
                _ => Err("min-commands must be an integer >= 2".to_string()),
            },
        }
    }

    fn check(&self, input: &LintInput) -> Vec<Violation> {
        let min_commands = self.min_commands(input);
        let mut violations = Vec::new();

        // the resolver relocates the RUN by its ordinal, so count all
        // shell-form RUNs in file order
        for (run_index, (stage, run, script, variant)) in shell_runs(input).iter().enumerate() {
            if !is_heredoc_candidate(&script.text, *variant, min_commands) {
                continue;
            }

            let range = range_for_span(input.source, run.span.start, run.span.end);
            violations.push(
                Violation::new(
                    input.path,
                    range,
                    self.metadata().code,
                    "chain of commands could be a heredoc RUN script",
                    self.metadata().default_severity,
                )
                .with_snippet(input.source.line(script.start_line))
                .with_fix(
                    SuggestedFix::deferred(
                        "rewrite the chain as a heredoc script",
                        FixSafety::Suggestion,
                        HEREDOC_RESOLVER_ID,
                        json!({ "run_index": run_index }),
                    )
                    .with_priority(HEREDOC_FIX_PRIORITY),
                )
                .in_stage(*stage),
            );
        }

        violations
    }
}
