//! tally — a Dockerfile linter and auto-fix engine.
//!
//! The core is a pure function of file bytes: parse, build a semantic model
//! over the multi-stage build, run registered rules, filter through inline
//! directives and severity overrides, and optionally compose the suggested
//! fixes into non-overlapping edits of the original text.

pub mod cli;
pub mod config;
pub mod directives;
pub mod fix;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod rules;
pub mod semantic;
pub mod shell;
pub mod source;
pub mod violations;

use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use walkdir::WalkDir;

use cli::{Cli, Commands};
use config::Config;
use fix::CancelToken;
use pipeline::FileReport;

/// File names treated as Dockerfiles during directory discovery.
fn is_dockerfile_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "dockerfile"
        || lower == "containerfile"
        || lower.starts_with("dockerfile.")
        || lower.ends_with(".dockerfile")
}

/// Expands files and directories into the list of Dockerfiles to lint.
fn discover_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };

    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push(root);
            continue;
        }
        for entry in WalkDir::new(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy();
            if is_dockerfile_name(&name) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

/// Applies fixes from `reports` and writes modified files back to disk.
/// Returns `(applied, unapplied)` counts.
fn apply_and_write_fixes(reports: &[FileReport], config: &Config) -> Result<(usize, usize)> {
    fix::install_builtin_resolvers();

    let violations: Vec<violations::Violation> = reports
        .iter()
        .flat_map(|r| r.violations.iter().cloned())
        .collect();
    let sources: HashMap<PathBuf, String> = reports
        .iter()
        .filter_map(|r| r.content.clone().map(|c| (r.path.clone(), c)))
        .collect();

    let outcomes =
        fix::apply_fixes(&violations, &sources, config.max_safety, &CancelToken::new());

    let mut applied = 0;
    let mut unapplied = 0;
    for outcome in &outcomes {
        applied += outcome.applied.len();
        unapplied += outcome.unapplied.len();
        if outcome.changed {
            std::fs::write(&outcome.path, &outcome.modified)
                .with_context(|| format!("writing {}", outcome.path.display()))?;
            info!(file = %outcome.path.display(), fixes = outcome.applied.len(), "wrote fixes");
        }
    }
    Ok((applied, unapplied))
}

fn list_rules(as_json: bool) {
    rules::install_builtin_rules();
    let all = rules::all();

    if as_json {
        let entries: Vec<serde_json::Value> = all
            .iter()
            .map(|rule| {
                let meta = rule.metadata();
                serde_json::json!({
                    "code": meta.code,
                    "name": meta.name,
                    "description": meta.description,
                    "severity": meta.default_severity.as_str(),
                    "category": meta.category.as_str(),
                    "doc_url": meta.doc_url,
                    "experimental": meta.experimental,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }

    println!("Registered rules:");
    for rule in all {
        let meta = rule.metadata();
        println!(
            "  {:<32} {:<8} {}",
            meta.code,
            meta.default_severity.to_string(),
            meta.description
        );
    }
}

/// Library entry point shared by `main` and the CLI tests. Returns the
/// process exit code.
pub fn run_with_args<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Lint {
            paths,
            format,
            fail_level,
            fix: apply_fix,
            max_safety,
            config: config_path,
            no_color,
        } => {
            let mut config = match &config_path {
                Some(path) => Config::from_file(path)?,
                None => Config::discover(
                    paths.first().map(PathBuf::as_path).unwrap_or(Path::new(".")),
                )?,
            };
            if let Some(format) = format {
                config.format = format;
            }
            if let Some(level) = fail_level {
                config.fail_level = level;
            }
            if let Some(safety) = max_safety {
                config.max_safety = safety.into();
            }

            let files = discover_files(&paths);
            if files.is_empty() {
                anyhow::bail!("no Dockerfiles found");
            }

            let mut reports = Vec::new();
            for file in &files {
                reports.push(pipeline::lint_path(file, &config)?);
            }

            let color = !no_color && std::io::stdout().is_terminal();
            output::print(&reports, config.format, color);

            if apply_fix {
                let (applied, unapplied) = apply_and_write_fixes(&reports, &config)?;
                if applied + unapplied > 0 {
                    eprintln!("{}", output::fix_summary(applied, unapplied));
                }
            }

            Ok(pipeline::exit_code(&reports, config.fail_level))
        }

        Commands::ListRules { json } => {
            list_rules(json);
            Ok(0)
        }
    }
}
