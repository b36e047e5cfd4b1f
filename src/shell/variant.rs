//! Shell variant identification.
//!
//! Stages may swap their shell with a `SHELL` instruction or a shell
//! directive comment; rules that only understand POSIX syntax use the
//! variant to skip PowerShell and cmd.exe stages.

use std::fmt;

/// The shell interpreting a stage's `RUN` scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellVariant {
    Bash,
    Dash,
    Zsh,
    Ash,
    /// Plain `sh` or an unspecified Bourne-style shell.
    Posix,
    PowerShell,
    Cmd,
    Other,
}

impl ShellVariant {
    /// Classifies a shell from its argv, e.g. `["/bin/bash", "-c"]`.
    ///
    /// Only the program's basename matters; flags are ignored.
    pub fn from_shell_cmd(argv: &[String]) -> ShellVariant {
        let Some(program) = argv.first() else {
            return ShellVariant::Posix;
        };
        let name = program
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(program)
            .to_ascii_lowercase();
        match name.trim_end_matches(".exe") {
            "bash" => ShellVariant::Bash,
            "dash" => ShellVariant::Dash,
            "zsh" => ShellVariant::Zsh,
            "ash" => ShellVariant::Ash,
            "sh" => ShellVariant::Posix,
            "pwsh" | "powershell" => ShellVariant::PowerShell,
            "cmd" => ShellVariant::Cmd,
            _ => ShellVariant::Other,
        }
    }

    /// PowerShell and cmd.exe scripts are not POSIX shell; rules built on
    /// the POSIX helpers skip stages with these variants.
    pub fn is_non_posix(&self) -> bool {
        matches!(self, ShellVariant::PowerShell | ShellVariant::Cmd)
    }
}

impl fmt::Display for ShellVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShellVariant::Bash => "bash",
            ShellVariant::Dash => "dash",
            ShellVariant::Zsh => "zsh",
            ShellVariant::Ash => "ash",
            ShellVariant::Posix => "sh",
            ShellVariant::PowerShell => "powershell",
            ShellVariant::Cmd => "cmd",
            ShellVariant::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_variant_from_paths() {
        assert_eq!(
            ShellVariant::from_shell_cmd(&argv(&["/bin/bash", "-c"])),
            ShellVariant::Bash
        );
        assert_eq!(
            ShellVariant::from_shell_cmd(&argv(&["/bin/sh", "-c"])),
            ShellVariant::Posix
        );
        assert_eq!(
            ShellVariant::from_shell_cmd(&argv(&["/usr/bin/dash"])),
            ShellVariant::Dash
        );
    }

    #[test]
    fn test_variant_windows_shells() {
        assert_eq!(
            ShellVariant::from_shell_cmd(&argv(&["powershell", "-command"])),
            ShellVariant::PowerShell
        );
        assert_eq!(
            ShellVariant::from_shell_cmd(&argv(&["C:\\Windows\\System32\\cmd.exe", "/S", "/C"])),
            ShellVariant::Cmd
        );
        assert_eq!(
            ShellVariant::from_shell_cmd(&argv(&["pwsh.exe"])),
            ShellVariant::PowerShell
        );
    }

    #[test]
    fn test_non_posix_gating() {
        assert!(ShellVariant::PowerShell.is_non_posix());
        assert!(ShellVariant::Cmd.is_non_posix());
        assert!(!ShellVariant::Bash.is_non_posix());
        assert!(!ShellVariant::Other.is_non_posix());
    }

    #[test]
    fn test_empty_argv_defaults_to_posix() {
        assert_eq!(ShellVariant::from_shell_cmd(&[]), ShellVariant::Posix);
    }
}
