//! Shell-command sub-language helpers for rules.
//!
//! A POSIX-leaning, best-effort view of `RUN` scripts: command discovery
//! with transparent wrappers, chain splitting that preserves separators,
//! heredoc candidacy, package-manager classification, and shell variant
//! identification. Nothing here executes anything; malformed input yields
//! empty results rather than errors.

mod commands;
mod lexer;
mod packages;
mod variant;

pub use commands::{
    contains_command, contains_command_with_variant, extract_chain_separators,
    extract_chained_commands, extract_commands_between_cds, find_command_in_chain, find_commands,
    is_heredoc_candidate, ChainMatch, CommandInfo,
};
pub use lexer::{tokenize, Token, TokenKind};
pub use packages::{extract_package_installs, PackageInstall, PackageManager};
pub use variant::ShellVariant;
