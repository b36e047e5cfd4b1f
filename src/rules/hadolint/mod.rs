//! Rules ported from the hadolint rule set, keeping their DL codes.

mod dl3003_cd_in_run;
mod dl3004_no_sudo;
mod dl3006_untagged_image;
mod dl3018_unpinned_apk;
mod dl3020_add_instead_of_copy;
mod dl3027_apt;

pub use dl3003_cd_in_run::CdInRun;
pub use dl3004_no_sudo::NoSudo;
pub use dl3006_untagged_image::UntaggedImage;
pub use dl3018_unpinned_apk::UnpinnedApkPackages;
pub use dl3020_add_instead_of_copy::AddInsteadOfCopy;
pub use dl3027_apt::AptInsteadOfAptGet;

use dockerfile_parser::{Instruction, RunInstruction};

use crate::parse::{run_script, ScriptRef};
use crate::rules::LintInput;
use crate::shell::ShellVariant;

/// Shell-form RUN instructions with their scripts and stage shell variant,
/// in source order. Exec-form RUNs carry no script and are skipped.
pub(crate) fn shell_runs<'a>(
    input: &LintInput<'a>,
) -> Vec<(usize, &'a RunInstruction, ScriptRef, ShellVariant)> {
    let mut runs = Vec::new();
    for stage in input.parse.stages().iter() {
        let variant = input
            .model
            .stage_info(stage.index)
            .map(|info| info.shell.variant)
            .unwrap_or(ShellVariant::Posix);
        for ins in stage.instructions.iter().copied() {
            if let Instruction::Run(run) = ins {
                if let Some(script) = run_script(run, input.source) {
                    runs.push((stage.index, run, script, variant));
                }
            }
        }
    }
    runs
}
