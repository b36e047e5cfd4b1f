//! The semantic model over a multi-stage Dockerfile.
//!
//! Built in a single pass by [`builder::build_model`]: stage indices and
//! names, variable scopes, per-stage shell settings, the cross-stage
//! dependency graph, package installs, effective-environment approximation
//! with undefined-variable references, and construction-time diagnostics.
//! Everything is index-based and owned; nothing borrows from the AST.

pub mod builder;
pub mod expand;
pub mod graph;
pub mod scope;

use indexmap::IndexMap;

use crate::shell::{PackageInstall, ShellVariant};
pub use graph::StageGraph;
pub use scope::{ArgEntry, EnvEntry, VariableScope};

/// Where a stage's shell setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellSource {
    /// Docker's default `/bin/sh -c`.
    Default,
    /// A `SHELL` instruction in the stage.
    Instruction,
    /// A `# hadolint shell=…` comment before the stage's FROM.
    Directive,
}

/// The shell a stage's RUN scripts execute under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSetting {
    pub argv: Vec<String>,
    pub variant: ShellVariant,
    pub source: ShellSource,
}

impl Default for ShellSetting {
    fn default() -> Self {
        ShellSetting {
            argv: vec!["/bin/sh".to_string(), "-c".to_string()],
            variant: ShellVariant::Posix,
            source: ShellSource::Default,
        }
    }
}

/// The parent of a stage: a prior stage, `scratch`, or an external image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImageRef {
    /// The reference as written (after global-ARG expansion).
    pub raw: String,
    pub is_stage_ref: bool,
    /// Index of the referenced stage; `-1` for external images.
    pub stage_index: i32,
    pub platform: Option<String>,
    /// 0-based line of the FROM instruction.
    pub line: usize,
    /// Byte span of the FROM instruction.
    pub span: (usize, usize),
}

impl BaseImageRef {
    pub fn is_scratch(&self) -> bool {
        self.raw.eq_ignore_ascii_case("scratch")
    }

    /// A real external image: not a prior stage and not `scratch`.
    pub fn is_external_image(&self) -> bool {
        !self.is_stage_ref && !self.is_scratch()
    }
}

/// A variable referenced without any definition in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedVarRef {
    pub name: String,
    /// 0-based line of the referencing instruction.
    pub line: usize,
    /// Closest declared name, when one is plausible.
    pub suggestion: Option<String>,
}

/// A `COPY --from=…` reference, resolved or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFromRef {
    /// The flag value as written.
    pub raw: String,
    /// Resolved prior-stage index, when the reference is a stage.
    pub target: Option<usize>,
    /// True when the reference is an external image.
    pub external: bool,
    /// 0-based line of the COPY instruction.
    pub line: usize,
    /// True when the COPY lives inside an ONBUILD trigger.
    pub onbuild: bool,
}

/// A semantic anomaly found while building the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionIssue {
    /// Namespaced rule code this issue surfaces under.
    pub code: &'static str,
    pub message: String,
    /// 0-based line.
    pub line: usize,
    /// Stage index, or `-1` for file-level issues.
    pub stage: i32,
}

/// Everything the builder derives about one stage.
#[derive(Debug, Clone)]
pub struct StageInfo {
    pub index: usize,
    /// Lowercased `AS` alias, if any.
    pub name: Option<String>,
    pub base: BaseImageRef,
    pub shell: ShellSetting,
    pub scope: VariableScope,
    /// ENV visible at the end of the stage, inherited through stage bases.
    pub effective_env: IndexMap<String, String>,
    pub undefined_vars: Vec<UndefinedVarRef>,
    pub copy_from: Vec<CopyFromRef>,
    pub onbuild_copy_from: Vec<CopyFromRef>,
    /// Package installs, lines 0-based in the file.
    pub packages: Vec<PackageInstall>,
    pub is_last: bool,
    /// 0-based line of the FROM instruction.
    pub from_line: usize,
}

/// The read-only model handed to rules via the LintInput.
#[derive(Debug)]
pub struct Model {
    stages: Vec<StageInfo>,
    /// Lowercased stage name → index of first declaration.
    names: IndexMap<String, usize>,
    graph: StageGraph,
    issues: Vec<ConstructionIssue>,
    global_scope: VariableScope,
}

impl Model {
    pub(crate) fn new(
        stages: Vec<StageInfo>,
        names: IndexMap<String, usize>,
        graph: StageGraph,
        issues: Vec<ConstructionIssue>,
        global_scope: VariableScope,
    ) -> Self {
        Model { stages, names, graph, issues, global_scope }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[StageInfo] {
        &self.stages
    }

    pub fn stage_info(&self, index: usize) -> Option<&StageInfo> {
        self.stages.get(index)
    }

    /// Case-insensitive lookup by `AS` alias.
    pub fn stage_by_name(&self, name: &str) -> Option<&StageInfo> {
        let index = *self.names.get(&name.to_ascii_lowercase())?;
        self.stages.get(index)
    }

    /// Resolves a variable inside a stage with Docker precedence.
    pub fn resolve_variable(&self, stage: usize, name: &str) -> Option<String> {
        self.stages.get(stage)?.scope.resolve(name)
    }

    pub fn global_scope(&self) -> &VariableScope {
        &self.global_scope
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn construction_issues(&self) -> &[ConstructionIssue] {
        &self.issues
    }

    /// Stages whose base is a real external image (not scratch, not a prior
    /// stage), for registry-backed collaborators.
    pub fn external_image_stages(&self) -> impl Iterator<Item = &StageInfo> {
        self.stages.iter().filter(|s| s.base.is_external_image())
    }

    pub fn unreachable_stages(&self) -> Vec<usize> {
        self.graph.unreachable_stages()
    }

    /// Re-evaluates a stage's undefined references after an external
    /// collaborator resolved the base image's real environment. Returns the
    /// references that are still undefined.
    pub fn recheck_undefined_vars(
        &self,
        stage: usize,
        resolved_env: &IndexMap<String, String>,
    ) -> Vec<UndefinedVarRef> {
        let Some(info) = self.stages.get(stage) else {
            return Vec::new();
        };
        info.undefined_vars
            .iter()
            .filter(|r| !resolved_env.contains_key(&r.name))
            .cloned()
            .collect()
    }
}
