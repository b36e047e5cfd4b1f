//! Edit ordering, overlap detection, and application.
//!
//! Positions arrive as (line, column) pairs against the *original* file;
//! internally everything maps to byte offsets. Applied edits feed a shift
//! tracker so later edits land on the right spot in the progressively
//! modified buffer, and deferred resolvers run against the current buffer
//! with their results mapped back into original-offset space for overlap
//! accounting.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::resolvers::find_resolver;
use super::CancelToken;
use crate::source::SourceMap;
use crate::violations::{FixSafety, SuggestedFix, TextEdit, Violation};

/// A fix that made it into the modified text.
#[derive(Debug, Clone)]
pub struct AppliedFix {
    pub rule_code: String,
    pub description: String,
}

/// A fix that was rejected, and why.
#[derive(Debug, Clone)]
pub struct UnappliedFix {
    pub rule_code: String,
    pub description: String,
    pub reason: String,
}

/// Per-file result of a planner run.
#[derive(Debug)]
pub struct FixOutcome {
    pub path: PathBuf,
    pub applied: Vec<AppliedFix>,
    pub unapplied: Vec<UnappliedFix>,
    pub modified: String,
    pub changed: bool,
}

/// One already-applied edit in original-offset space.
#[derive(Debug, Clone, Copy)]
struct AppliedSpan {
    orig_start: usize,
    orig_end: usize,
    /// Replacement length minus original length.
    delta: i64,
}

/// Maps original byte offsets through the edits applied so far.
#[derive(Debug, Default)]
struct ShiftTracker {
    /// Sorted by `orig_end`.
    spans: Vec<AppliedSpan>,
}

impl ShiftTracker {
    fn record(&mut self, orig_start: usize, orig_end: usize, delta: i64) {
        let at = self.spans.partition_point(|s| s.orig_end <= orig_end);
        self.spans.insert(at, AppliedSpan { orig_start, orig_end, delta });
    }

    /// Current position of an original offset: shifted by every applied
    /// edit that ends at or before it.
    fn to_current(&self, orig: usize) -> usize {
        let mut shift = 0i64;
        for span in &self.spans {
            if span.orig_end <= orig {
                shift += span.delta;
            } else {
                break;
            }
        }
        (orig as i64 + shift) as usize
    }

    /// Original offset a current position corresponds to; inverse of
    /// [`ShiftTracker::to_current`] for positions outside replaced regions.
    fn to_original(&self, current: usize) -> usize {
        let mut shift = 0i64;
        for span in &self.spans {
            let mapped_end = span.orig_end as i64 + shift + span.delta;
            if mapped_end <= current as i64 {
                shift += span.delta;
            } else {
                break;
            }
        }
        (current as i64 - shift).max(0) as usize
    }

    /// Whether `[start, end)` in original space intersects any applied edit.
    /// Zero-width ranges are points; touching endpoints do not overlap.
    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.spans
            .iter()
            .any(|s| s.orig_start < end && start < s.orig_end)
    }
}

/// One fix with its edits resolved to original byte offsets.
struct PlannedFix {
    rule_code: String,
    description: String,
    priority: i32,
    /// `(start, end, replacement)` in original-offset space; empty for
    /// deferred fixes.
    edits: Vec<(usize, usize, String)>,
    resolver: Option<(String, serde_json::Value)>,
    /// Sort position: first edit start, or the violation start.
    sort_offset: usize,
}

/// Applies every eligible fix and returns one record per touched file.
///
/// Fixes above `max_safety` are reported unapplied. The result depends only
/// on fix priorities and positions, never on the order violations were
/// collected in.
pub fn apply_fixes(
    violations: &[Violation],
    sources: &HashMap<PathBuf, String>,
    max_safety: FixSafety,
    cancel: &CancelToken,
) -> Vec<FixOutcome> {
    let mut by_file: IndexMap<&Path, Vec<(&Violation, &SuggestedFix)>> = IndexMap::new();
    for violation in violations {
        if let Some(fix) = &violation.fix {
            by_file.entry(violation.file.as_path()).or_default().push((violation, fix));
        }
    }

    let mut outcomes = Vec::new();
    for (path, fixes) in by_file {
        if cancel.is_cancelled() {
            break;
        }
        let Some(original) = sources.get(path) else {
            debug!(file = %path.display(), "no source content for file; skipping fixes");
            continue;
        };
        outcomes.push(apply_file_fixes(path, original, &fixes, max_safety, cancel));
    }
    outcomes
}

fn apply_file_fixes(
    path: &Path,
    original: &str,
    fixes: &[(&Violation, &SuggestedFix)],
    max_safety: FixSafety,
    cancel: &CancelToken,
) -> FixOutcome {
    let map = SourceMap::new(original);
    let mut applied = Vec::new();
    let mut unapplied = Vec::new();
    let mut planned = Vec::new();

    for &(violation, fix) in fixes {
        if fix.safety > max_safety {
            unapplied.push(UnappliedFix {
                rule_code: violation.code.clone(),
                description: fix.description.clone(),
                reason: format!("safety level exceeds the configured threshold ({max_safety:?})"),
            });
            continue;
        }

        match plan_fix(&map, violation, fix) {
            Ok(plan) => planned.push(plan),
            Err(reason) => unapplied.push(UnappliedFix {
                rule_code: violation.code.clone(),
                description: fix.description.clone(),
                reason,
            }),
        }
    }

    // priority, then position, then stable rule identity: collection order
    // never matters
    planned.sort_by(|a, b| {
        (a.priority, a.sort_offset, &a.rule_code, &a.description).cmp(&(
            b.priority,
            b.sort_offset,
            &b.rule_code,
            &b.description,
        ))
    });

    let mut buffer = original.to_string();
    let mut tracker = ShiftTracker::default();

    for plan in planned {
        if cancel.is_cancelled() {
            break;
        }

        if let Some((resolver_id, data)) = &plan.resolver {
            // resolver edits are recomputed against the current buffer, so
            // they legitimately cover regions earlier edits already touched;
            // no overlap check against applied spans
            let resolved = match run_resolver(resolver_id, path, &buffer, data, &tracker) {
                Ok(resolved) => resolved,
                Err(reason) => {
                    unapplied.push(UnappliedFix {
                        rule_code: plan.rule_code.clone(),
                        description: plan.description.clone(),
                        reason,
                    });
                    continue;
                }
            };

            // zero edits: the text already reached the desired state
            for edit in resolved {
                let current_len = edit.cur_end - edit.cur_start;
                buffer.replace_range(edit.cur_start..edit.cur_end, &edit.replacement);
                tracker.record(
                    edit.orig_start,
                    edit.orig_end,
                    edit.replacement.len() as i64 - current_len as i64,
                );
            }
            applied.push(AppliedFix {
                rule_code: plan.rule_code,
                description: plan.description,
            });
            continue;
        }

        if plan.edits.iter().any(|(start, end, _)| tracker.overlaps(*start, *end)) {
            unapplied.push(UnappliedFix {
                rule_code: plan.rule_code.clone(),
                description: plan.description.clone(),
                reason: "overlap".to_string(),
            });
            continue;
        }

        for (start, end, replacement) in &plan.edits {
            let cur_start = tracker.to_current(*start);
            let cur_end = tracker.to_current(*end);
            buffer.replace_range(cur_start..cur_end, replacement);
            tracker.record(*start, *end, replacement.len() as i64 - (*end - *start) as i64);
        }

        applied.push(AppliedFix {
            rule_code: plan.rule_code,
            description: plan.description,
        });
    }

    FixOutcome {
        path: path.to_path_buf(),
        changed: buffer != original,
        modified: buffer,
        applied,
        unapplied,
    }
}

/// Resolves a fix's edits to original byte offsets, validating that every
/// position exists in the original text.
fn plan_fix(
    map: &SourceMap,
    violation: &Violation,
    fix: &SuggestedFix,
) -> Result<PlannedFix, String> {
    let mut edits = Vec::new();
    for edit in &fix.edits {
        let (start, end) = edit_offsets(map, edit)?;
        if start > end {
            return Err("inverted edit range".to_string());
        }
        edits.push((start, end, edit.replacement.clone()));
    }
    edits.sort_by_key(|(start, end, _)| (*start, *end));

    // edits within one fix must be applicable together
    for pair in edits.windows(2) {
        if pair[1].0 < pair[0].1 {
            return Err("edits within the fix overlap each other".to_string());
        }
    }

    let sort_offset = edits.first().map(|(start, _, _)| *start).unwrap_or_else(|| {
        map.offset_of(
            violation.range.start_line.saturating_sub(1),
            violation.range.start_col,
        )
        .unwrap_or(0)
    });

    Ok(PlannedFix {
        rule_code: violation.code.clone(),
        description: fix.description.clone(),
        priority: fix.priority,
        edits,
        resolver: fix.resolver.as_ref().map(|r| (r.id.clone(), r.data.clone())),
        sort_offset,
    })
}

fn edit_offsets(map: &SourceMap, edit: &TextEdit) -> Result<(usize, usize), String> {
    let range = edit.range;
    let start = map
        .offset_of(range.start_line.saturating_sub(1), range.start_col)
        .ok_or_else(|| format!("start position {}:{} does not exist", range.start_line, range.start_col))?;
    let end = map
        .offset_of(range.end_line.saturating_sub(1), range.end_col)
        .ok_or_else(|| format!("end position {}:{} does not exist", range.end_line, range.end_col))?;
    Ok((start, end))
}

/// A resolver edit carries both its current-buffer offsets (where it gets
/// applied) and the equivalent original-offset span (for shift accounting).
struct ResolvedEdit {
    orig_start: usize,
    orig_end: usize,
    cur_start: usize,
    cur_end: usize,
    replacement: String,
}

/// Runs a deferred resolver against the current buffer.
fn run_resolver(
    resolver_id: &str,
    path: &Path,
    buffer: &str,
    data: &serde_json::Value,
    tracker: &ShiftTracker,
) -> Result<Vec<ResolvedEdit>, String> {
    let resolver = find_resolver(resolver_id)
        .ok_or_else(|| format!("no resolver registered for id `{resolver_id}`"))?;
    let resolved = resolver.resolve(path, buffer, data)?;

    let current_map = SourceMap::new(buffer);
    let mut edits = Vec::new();
    for edit in resolved {
        let (cur_start, cur_end) = edit_offsets(&current_map, &edit)?;
        edits.push(ResolvedEdit {
            orig_start: tracker.to_original(cur_start),
            orig_end: tracker.to_original(cur_end),
            cur_start,
            cur_end,
            replacement: edit.replacement,
        });
    }
    edits.sort_by_key(|e| (e.cur_start, e.cur_end));
    Ok(edits)
}
