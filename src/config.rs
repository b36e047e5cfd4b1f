//! Configuration: discovery, TOML loading, and `TALLY_*` environment
//! mapping.
//!
//! A `tally.toml` (or `.tally.toml`) is discovered by walking upward from
//! the lint root. Environment variables map into the same key space with a
//! `TALLY_` prefix; `_` separates segments, and a fixed table re-hyphenates
//! known multi-word keys (`FAIL_LEVEL` → `fail-level`).

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::violations::{FixSafety, Severity};

/// Output format selection, shared by config and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Sarif,
    Github,
    Markdown,
}

/// Minimum severity that makes the process exit non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailLevel {
    None,
    Style,
    Info,
    Warning,
    Error,
}

impl FailLevel {
    /// Whether a violation of `severity` meets this fail level.
    pub fn is_met_by(&self, severity: Severity) -> bool {
        let threshold = match self {
            FailLevel::None => return false,
            FailLevel::Style => Severity::Style,
            FailLevel::Info => Severity::Info,
            FailLevel::Warning => Severity::Warning,
            FailLevel::Error => Severity::Error,
        };
        severity >= threshold
    }
}

impl FromStr for FailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(FailLevel::None),
            "style" => Ok(FailLevel::Style),
            "info" => Ok(FailLevel::Info),
            "warning" | "warn" => Ok(FailLevel::Warning),
            "error" => Ok(FailLevel::Error),
            other => Err(format!("unknown fail level `{other}`")),
        }
    }
}

/// Inline-directive processing switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DirectiveConfig {
    pub enabled: bool,
    /// Report directives that suppressed nothing.
    pub warn_unused: bool,
    /// Reject unknown rule codes inside directives.
    pub validate_rule_codes: bool,
    /// Require a `;reason=` on every directive.
    pub require_reason: bool,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        DirectiveConfig {
            enabled: true,
            warn_unused: false,
            validate_rule_codes: false,
            require_reason: false,
        }
    }
}

/// Heredoc-conversion tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HeredocConfig {
    pub min_commands: usize,
}

impl Default for HeredocConfig {
    fn default() -> Self {
        HeredocConfig { min_commands: 4 }
    }
}

/// Raw TOML shape; converted into [`Config`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawConfig {
    include: Vec<String>,
    exclude: Vec<String>,
    format: Option<OutputFormat>,
    fail_level: Option<String>,
    max_safety: Option<String>,
    severity: IndexMap<String, String>,
    rules: IndexMap<String, toml::Value>,
    directives: DirectiveConfig,
    heredoc: HeredocConfig,
}

/// Effective configuration for one lint run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Rule-code globs; include takes precedence over exclude.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub severity_overrides: IndexMap<String, Severity>,
    /// Per-rule options, opaque to the framework.
    pub rule_options: IndexMap<String, serde_json::Value>,
    pub directives: DirectiveConfig,
    pub format: OutputFormat,
    pub fail_level: FailLevel,
    /// Highest fix safety the planner may apply.
    pub max_safety: FixSafety,
    pub heredoc: HeredocConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            include: Vec::new(),
            exclude: Vec::new(),
            severity_overrides: IndexMap::new(),
            rule_options: IndexMap::new(),
            directives: DirectiveConfig::default(),
            format: OutputFormat::Text,
            fail_level: FailLevel::Warning,
            max_safety: FixSafety::Safe,
            heredoc: HeredocConfig::default(),
        }
    }
}

const CONFIG_FILE_NAMES: &[&str] = &["tally.toml", ".tally.toml"];

impl Config {
    /// Walks upward from `start` looking for a config file, then applies
    /// `TALLY_*` environment variables on top.
    pub fn discover(start: &Path) -> Result<Config> {
        let mut config = None;
        let mut dir = Some(if start.is_dir() {
            start.to_path_buf()
        } else {
            start.parent().map(Path::to_path_buf).unwrap_or_default()
        });

        while let Some(current) = dir {
            for name in CONFIG_FILE_NAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    debug!(path = %candidate.display(), "loading configuration");
                    config = Some(Config::from_file(&candidate)?);
                    break;
                }
            }
            if config.is_some() {
                break;
            }
            dir = current.parent().map(Path::to_path_buf);
        }

        let mut config = config.unwrap_or_default();
        config.apply_env(std::env::vars());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Config::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        let raw: RawConfig = toml::from_str(text).context("invalid configuration")?;

        let mut severity_overrides = IndexMap::new();
        for (code, level) in raw.severity {
            let severity = level
                .parse::<Severity>()
                .map_err(|e| anyhow::anyhow!("severity for `{code}`: {e}"))?;
            severity_overrides.insert(code, severity);
        }

        let mut rule_options = IndexMap::new();
        for (code, value) in raw.rules {
            let json = serde_json::to_value(value).context("rule options")?;
            rule_options.insert(code, json);
        }

        let mut config = Config {
            include: raw.include,
            exclude: raw.exclude,
            severity_overrides,
            rule_options,
            directives: raw.directives,
            heredoc: raw.heredoc,
            ..Config::default()
        };
        if let Some(format) = raw.format {
            config.format = format;
        }
        if let Some(level) = raw.fail_level {
            config.fail_level = level.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        if let Some(safety) = raw.max_safety {
            config.max_safety = parse_safety(&safety).map_err(|e| anyhow::anyhow!(e))?;
        }
        Ok(config)
    }

    /// Applies `TALLY_*` variables. Unknown keys are ignored with a debug
    /// log so typos are discoverable without being fatal.
    pub fn apply_env(&mut self, vars: impl Iterator<Item = (String, String)>) {
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix("TALLY_") else {
                continue;
            };
            match normalize_env_key(stripped).as_str() {
                "format" => {
                    if let Ok(format) = parse_format(&value) {
                        self.format = format;
                    }
                }
                "fail-level" => {
                    if let Ok(level) = value.parse() {
                        self.fail_level = level;
                    }
                }
                "max-safety" => {
                    if let Ok(safety) = parse_safety(&value) {
                        self.max_safety = safety;
                    }
                }
                "include" => {
                    self.include = split_list(&value);
                }
                "exclude" => {
                    self.exclude = split_list(&value);
                }
                "heredoc.min-commands" | "min-commands" => {
                    if let Ok(n) = value.parse::<usize>() {
                        self.heredoc.min_commands = n;
                    }
                }
                "directives.enabled" => self.directives.enabled = parse_bool(&value),
                "directives.warn-unused" => self.directives.warn_unused = parse_bool(&value),
                "directives.validate-rule-codes" => {
                    self.directives.validate_rule_codes = parse_bool(&value)
                }
                "directives.require-reason" => self.directives.require_reason = parse_bool(&value),
                other => debug!(key = other, "ignoring unknown TALLY_ variable"),
            }
        }
    }

    /// Include wins over exclude; with no include list every rule is a
    /// candidate, minus the excluded ones.
    pub fn is_rule_enabled(&self, code: &str) -> bool {
        if self.include.iter().any(|p| rule_glob_matches(p, code)) {
            return true;
        }
        if self.exclude.iter().any(|p| rule_glob_matches(p, code)) {
            return false;
        }
        self.include.is_empty()
    }

    pub fn effective_severity(&self, code: &str, default: Severity) -> Severity {
        self.severity_overrides.get(code).copied().unwrap_or(default)
    }

    pub fn rule_config(&self, code: &str) -> Option<&serde_json::Value> {
        self.rule_options.get(code)
    }
}

/// `*` matches everything, `<namespace>/*` a namespace, otherwise exact.
fn rule_glob_matches(pattern: &str, code: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(namespace) = pattern.strip_suffix("/*") {
        return code
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('/'));
    }
    pattern == code
}

/// Lowercase, `_` → `.`, then the fixed re-hyphenation table for known
/// multi-word keys.
fn normalize_env_key(key: &str) -> String {
    const REHYPHENATE: &[(&str, &str)] = &[
        ("fail.level", "fail-level"),
        ("max.safety", "max-safety"),
        ("max.lines", "max-lines"),
        ("min.commands", "min-commands"),
        ("warn.unused", "warn-unused"),
        ("validate.rule.codes", "validate-rule-codes"),
        ("require.reason", "require-reason"),
    ];

    let mut normalized = key.to_ascii_lowercase().replace('_', ".");
    for (dotted, hyphenated) in REHYPHENATE {
        normalized = normalized.replace(dotted, hyphenated);
    }
    normalized
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        "sarif" => Ok(OutputFormat::Sarif),
        "github" => Ok(OutputFormat::Github),
        "markdown" => Ok(OutputFormat::Markdown),
        other => Err(format!("unknown format `{other}`")),
    }
}

fn parse_safety(value: &str) -> Result<FixSafety, String> {
    match value.to_ascii_lowercase().as_str() {
        "safe" => Ok(FixSafety::Safe),
        "suggestion" => Ok(FixSafety::Suggestion),
        "unsafe" => Ok(FixSafety::Unsafe),
        other => Err(format!("unknown fix safety `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.fail_level, FailLevel::Warning);
        assert_eq!(config.max_safety, FixSafety::Safe);
        assert!(config.directives.enabled);
        assert!(config.is_rule_enabled("hadolint/DL3003"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::from_toml_str(
            r#"
            exclude = ["tally/prefer-heredoc"]
            fail-level = "error"
            max-safety = "suggestion"

            [severity]
            "hadolint/DL3006" = "off"

            [rules."tally/prefer-heredoc"]
            min-commands = 3

            [directives]
            warn-unused = true

            [heredoc]
            min-commands = 5
            "#,
        )
        .unwrap();

        assert!(!config.is_rule_enabled("tally/prefer-heredoc"));
        assert!(config.is_rule_enabled("hadolint/DL3003"));
        assert_eq!(config.fail_level, FailLevel::Error);
        assert_eq!(config.max_safety, FixSafety::Suggestion);
        assert_eq!(
            config.effective_severity("hadolint/DL3006", Severity::Warning),
            Severity::Off
        );
        assert_eq!(
            config.rule_config("tally/prefer-heredoc").unwrap()["min-commands"],
            serde_json::json!(3)
        );
        assert!(config.directives.warn_unused);
        assert_eq!(config.heredoc.min_commands, 5);
    }

    #[test]
    fn test_include_beats_exclude() {
        let config = Config {
            include: vec!["hadolint/DL3003".to_string()],
            exclude: vec!["hadolint/*".to_string()],
            ..Config::default()
        };
        assert!(config.is_rule_enabled("hadolint/DL3003"));
        assert!(!config.is_rule_enabled("hadolint/DL3004"));
        // include list present: everything else is opt-in
        assert!(!config.is_rule_enabled("tally/no-unreachable-stages"));
    }

    #[test]
    fn test_rule_glob_matching() {
        assert!(rule_glob_matches("*", "hadolint/DL3003"));
        assert!(rule_glob_matches("hadolint/*", "hadolint/DL3003"));
        assert!(!rule_glob_matches("hadolint/*", "tally/x"));
        assert!(rule_glob_matches("tally/x", "tally/x"));
        assert!(!rule_glob_matches("tally", "tally/x"));
    }

    #[test]
    fn test_env_key_normalization() {
        assert_eq!(normalize_env_key("FAIL_LEVEL"), "fail-level");
        assert_eq!(normalize_env_key("FORMAT"), "format");
        assert_eq!(normalize_env_key("DIRECTIVES_WARN_UNUSED"), "directives.warn-unused");
        assert_eq!(normalize_env_key("HEREDOC_MIN_COMMANDS"), "heredoc.min-commands");
    }

    #[test]
    fn test_apply_env() {
        let mut config = Config::default();
        config.apply_env(
            [
                ("TALLY_FAIL_LEVEL".to_string(), "error".to_string()),
                ("TALLY_FORMAT".to_string(), "json".to_string()),
                ("TALLY_EXCLUDE".to_string(), "hadolint/*, tally/x".to_string()),
                ("TALLY_DIRECTIVES_WARN_UNUSED".to_string(), "true".to_string()),
                ("OTHER_VAR".to_string(), "ignored".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(config.fail_level, FailLevel::Error);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.exclude, ["hadolint/*", "tally/x"]);
        assert!(config.directives.warn_unused);
    }

    #[test]
    #[serial]
    fn test_discover_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tally.toml"), "fail-level = \"error\"\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::discover(&nested).unwrap();
        assert_eq!(config.fail_level, FailLevel::Error);
    }

    #[test]
    fn test_fail_level_thresholds() {
        assert!(FailLevel::Warning.is_met_by(Severity::Error));
        assert!(FailLevel::Warning.is_met_by(Severity::Warning));
        assert!(!FailLevel::Warning.is_met_by(Severity::Info));
        assert!(!FailLevel::None.is_met_by(Severity::Error));
    }
}
