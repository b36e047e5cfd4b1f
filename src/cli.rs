use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{FailLevel, OutputFormat};
use crate::violations::FixSafety;

#[derive(Parser)]
#[command(name = "tally", version, about = "A Dockerfile linter and auto-fix engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI-facing mirror of [`FixSafety`].
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SafetyArg {
    Safe,
    Suggestion,
    Unsafe,
}

impl From<SafetyArg> for FixSafety {
    fn from(arg: SafetyArg) -> FixSafety {
        match arg {
            SafetyArg::Safe => FixSafety::Safe,
            SafetyArg::Suggestion => FixSafety::Suggestion,
            SafetyArg::Unsafe => FixSafety::Unsafe,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Lint Dockerfiles and optionally apply fixes")]
    Lint {
        #[arg(help = "Files or directories to lint; directories are searched for Dockerfiles")]
        paths: Vec<PathBuf>,

        #[arg(long, value_enum, help = "Output format")]
        format: Option<OutputFormat>,

        #[arg(long, value_enum, help = "Severity that makes the exit code non-zero")]
        fail_level: Option<FailLevel>,

        #[arg(long, help = "Apply machine-applicable fixes in place")]
        fix: bool,

        #[arg(long, value_enum, help = "Highest fix safety level to apply with --fix")]
        max_safety: Option<SafetyArg>,

        #[arg(long, help = "Explicit configuration file (skips discovery)")]
        config: Option<PathBuf>,

        #[arg(long, help = "Disable colored output")]
        no_color: bool,
    },

    #[command(about = "List all registered rules")]
    ListRules {
        #[arg(long, help = "Emit the rule list as JSON")]
        json: bool,
    },
}
