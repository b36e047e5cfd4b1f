//! The rule contract and the process-wide registry.
//!
//! A rule is a stateless `Metadata` + `Check` pair. Rules self-register at
//! startup through [`install_builtin_rules`]; after that point the registry
//! is read-only, so concurrent `all()` reads need no coordination beyond the
//! lock. Rules must not keep mutable state between invocations.

pub mod buildkit;
pub mod hadolint;
pub mod tally;

use std::path::Path;
use std::sync::{Arc, Once, RwLock};

use indexmap::IndexSet;
use once_cell::sync::Lazy;

use crate::parse::ParseResult;
use crate::semantic::Model;
use crate::source::SourceMap;
use crate::violations::{Severity, Violation};

/// Broad classification used by formatters and docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Correctness,
    Security,
    Performance,
    Style,
    Deprecation,
    Portability,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Correctness => "correctness",
            RuleCategory::Security => "security",
            RuleCategory::Performance => "performance",
            RuleCategory::Style => "style",
            RuleCategory::Deprecation => "deprecation",
            RuleCategory::Portability => "portability",
        }
    }
}

/// Static description of a rule.
#[derive(Debug, Clone)]
pub struct RuleMetadata {
    /// Globally unique, namespaced (`tally/*`, `hadolint/*`, `buildkit/*`).
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub default_severity: Severity,
    pub category: RuleCategory,
    pub doc_url: Option<&'static str>,
    pub experimental: bool,
    /// Priority stamped onto this rule's fixes; content edits run at 0,
    /// structural transforms in the high 90s.
    pub fix_priority: i32,
}

impl RuleMetadata {
    pub const fn new(
        code: &'static str,
        name: &'static str,
        description: &'static str,
        default_severity: Severity,
        category: RuleCategory,
    ) -> Self {
        RuleMetadata {
            code,
            name,
            description,
            default_severity,
            category,
            doc_url: None,
            experimental: false,
            fix_priority: 0,
        }
    }
}

/// Heredoc-related tuning passed through from configuration.
#[derive(Debug, Clone, Copy)]
pub struct HeredocOptions {
    /// Minimum chained commands before a heredoc conversion is suggested.
    pub min_commands: usize,
}

impl Default for HeredocOptions {
    fn default() -> Self {
        HeredocOptions { min_commands: 4 }
    }
}

/// Everything a rule may inspect for one file. Borrowed and read-only.
pub struct LintInput<'a> {
    pub path: &'a Path,
    pub source: &'a SourceMap,
    pub parse: &'a ParseResult,
    pub model: &'a Model,
    /// This rule's configuration value, opaque to the framework.
    pub config: Option<&'a serde_json::Value>,
    /// Codes of all enabled rules, for cross-rule coordination.
    pub enabled_rules: &'a IndexSet<String>,
    pub heredoc: HeredocOptions,
}

impl<'a> LintInput<'a> {
    pub fn rule_enabled(&self, code: &str) -> bool {
        self.enabled_rules.contains(code)
    }
}

/// A network/registry check a rule wants the async collaborator to run.
/// The core only transports these; it never performs them.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub rule_code: String,
    /// The external image reference to resolve.
    pub image: String,
    /// Stage the request originates from.
    pub stage: usize,
    /// Opaque payload echoed back in the completion.
    pub data: serde_json::Value,
}

/// Completion message from the async collaborator. A completion may
/// suppress a previously emitted file-level violation.
#[derive(Debug, Clone)]
pub struct CompletedCheck {
    pub rule_code: String,
    pub stage: usize,
    /// When true, violations this rule emitted for the stage are dropped.
    pub suppress: bool,
    pub data: serde_json::Value,
}

/// The rule contract.
pub trait Rule: Send + Sync {
    fn metadata(&self) -> RuleMetadata;

    fn check(&self, input: &LintInput) -> Vec<Violation>;

    /// JSON-Schema for this rule's configuration, when configurable.
    fn schema(&self) -> Option<serde_json::Value> {
        None
    }

    fn default_config(&self) -> Option<serde_json::Value> {
        None
    }

    fn validate_config(&self, _config: &serde_json::Value) -> Result<(), String> {
        Ok(())
    }

    /// Requests for the external async collaborator, if the rule needs
    /// registry-backed data.
    fn plan_async(&self, _input: &LintInput) -> Vec<CheckRequest> {
        Vec::new()
    }
}

static REGISTRY: Lazy<RwLock<Vec<Arc<dyn Rule>>>> = Lazy::new(|| RwLock::new(Vec::new()));

/// Registers a rule. First registration wins for a given code; registering
/// the same code again is a no-op so startup paths stay idempotent.
pub fn register(rule: Arc<dyn Rule>) {
    let mut registry = REGISTRY.write().expect("rule registry poisoned");
    let code = rule.metadata().code;
    if registry.iter().any(|r| r.metadata().code == code) {
        return;
    }
    registry.push(rule);
}

/// All registered rules, in first-registration order.
pub fn all() -> Vec<Arc<dyn Rule>> {
    REGISTRY.read().expect("rule registry poisoned").clone()
}

/// Looks a rule up by its code.
pub fn find(code: &str) -> Option<Arc<dyn Rule>> {
    REGISTRY
        .read()
        .expect("rule registry poisoned")
        .iter()
        .find(|r| r.metadata().code == code)
        .cloned()
}

/// True when `code` belongs to a registered rule.
pub fn is_known_rule(code: &str) -> bool {
    find(code).is_some()
}

static INSTALL: Once = Once::new();

/// Installs the built-in rule set. Called once from the pipeline and the
/// binary's startup path; later calls are no-ops.
pub fn install_builtin_rules() {
    INSTALL.call_once(|| {
        for rule in builtin_rules() {
            register(rule);
        }
    });
}

fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(buildkit::MaintainerDeprecated),
        Arc::new(buildkit::UndefinedVar),
        Arc::new(hadolint::CdInRun),
        Arc::new(hadolint::NoSudo),
        Arc::new(hadolint::UntaggedImage),
        Arc::new(hadolint::UnpinnedApkPackages),
        Arc::new(hadolint::AddInsteadOfCopy),
        Arc::new(hadolint::AptInsteadOfAptGet),
        Arc::new(tally::NoUnreachableStages),
        Arc::new(tally::PreferHeredoc),
    ]
}
