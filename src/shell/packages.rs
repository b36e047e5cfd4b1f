//! Package-manager invocation classification.
//!
//! Recognizes `<manager> <install-like-subcommand> pkg…` in head position and
//! extracts the package list. Used by the semantic builder (per-stage install
//! inventory) and by pin/cleanup rules.

use std::fmt;

use super::commands::{split_segments, CommandInfo};
use super::lexer::tokenize;
use super::variant::ShellVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Apt,
    AptGet,
    Apk,
    Dnf,
    Yum,
    Zypper,
    Npm,
    Yarn,
    Pnpm,
    Pip,
    Bundle,
    Cargo,
    Dotnet,
    Composer,
    Uv,
    Bun,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManager::Apt => "apt",
            PackageManager::AptGet => "apt-get",
            PackageManager::Apk => "apk",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Zypper => "zypper",
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Pip => "pip",
            PackageManager::Bundle => "bundle",
            PackageManager::Cargo => "cargo",
            PackageManager::Dotnet => "dotnet",
            PackageManager::Composer => "composer",
            PackageManager::Uv => "uv",
            PackageManager::Bun => "bun",
        };
        f.write_str(name)
    }
}

/// One classified install invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInstall {
    pub manager: PackageManager,
    /// Positional package arguments; may be empty (`yarn install`).
    pub packages: Vec<String>,
    /// 0-based line of the manager command within the script.
    pub line: usize,
}

fn manager_for(basename: &str) -> Option<PackageManager> {
    Some(match basename {
        "apt" => PackageManager::Apt,
        "apt-get" => PackageManager::AptGet,
        "apk" => PackageManager::Apk,
        "dnf" | "microdnf" => PackageManager::Dnf,
        "yum" => PackageManager::Yum,
        "zypper" => PackageManager::Zypper,
        "npm" => PackageManager::Npm,
        "yarn" => PackageManager::Yarn,
        "pnpm" => PackageManager::Pnpm,
        "pip" | "pip2" | "pip3" => PackageManager::Pip,
        "bundle" => PackageManager::Bundle,
        "cargo" => PackageManager::Cargo,
        "dotnet" => PackageManager::Dotnet,
        "composer" => PackageManager::Composer,
        "uv" => PackageManager::Uv,
        "bun" => PackageManager::Bun,
        _ => return None,
    })
}

/// Whether `sub` is an install-like subcommand for `manager`.
fn installs(manager: PackageManager, sub: &str) -> bool {
    let subs: &[&str] = match manager {
        PackageManager::Apt | PackageManager::AptGet => &["install", "upgrade", "dist-upgrade"],
        PackageManager::Apk => &["add"],
        PackageManager::Dnf | PackageManager::Yum => &["install", "update", "upgrade"],
        PackageManager::Zypper => &["install", "in"],
        PackageManager::Npm => &["install", "i", "ci", "add"],
        PackageManager::Yarn => &["add", "install"],
        PackageManager::Pnpm => &["add", "install", "i"],
        PackageManager::Pip => &["install"],
        PackageManager::Bundle => &["add", "install"],
        PackageManager::Cargo => &["install", "add"],
        PackageManager::Dotnet => &["add"],
        PackageManager::Composer => &["require", "install"],
        PackageManager::Uv => &["add", "install"],
        PackageManager::Bun => &["add", "install", "i"],
    };
    subs.contains(&sub)
}

/// Flags that consume the following argument; their values are not packages.
const VALUE_FLAGS: &[&str] = &[
    "-o", "-t", "-r", "-f", "-c", "--target", "--requirement", "--index-url", "--repository",
    "--virtual",
];

fn classify(cmd: &CommandInfo) -> Option<PackageInstall> {
    let manager = manager_for(cmd.basename())?;

    let mut args = cmd.args.iter().peekable();

    // `uv pip install …` nests one level
    let (manager, sub) = loop {
        let arg = args.next()?;
        if arg.starts_with('-') {
            if VALUE_FLAGS.contains(&arg.as_str()) {
                args.next();
            }
            continue;
        }
        if manager == PackageManager::Uv && arg == "pip" {
            let sub = loop {
                let a = args.next()?;
                if !a.starts_with('-') {
                    break a;
                }
            };
            break (PackageManager::Uv, sub.clone());
        }
        break (manager, arg.clone());
    };

    if !installs(manager, &sub) {
        return None;
    }

    let mut packages = Vec::new();
    while let Some(arg) = args.next() {
        if arg.starts_with('-') {
            if VALUE_FLAGS.contains(&arg.as_str()) {
                args.next();
            }
            continue;
        }
        // `dotnet add package X` carries a keyword before the name
        if manager == PackageManager::Dotnet && arg == "package" {
            continue;
        }
        packages.push(arg.clone());
    }

    Some(PackageInstall { manager, packages, line: cmd.line })
}

/// Extracts every classified package install from a script, in order.
pub fn extract_package_installs(script: &str, variant: ShellVariant) -> Vec<PackageInstall> {
    if variant.is_non_posix() {
        return Vec::new();
    }
    split_segments(&tokenize(script), script)
        .iter()
        .filter_map(|segment| classify(&segment.command()?))
        .collect()
}
