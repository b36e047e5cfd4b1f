//! Single-pass construction of the semantic [`Model`].
//!
//! The builder never fails: structural anomalies become
//! [`ConstructionIssue`]s and the walk continues. Stage order follows source
//! order; names resolve case-insensitively to their first declaration.

use indexmap::IndexMap;

use dockerfile_parser::Instruction;

use crate::directives::ShellDirective;
use crate::parse::{from_platform, instruction_span, line_of, run_script, ParseResult, ScriptRef};
use crate::semantic::expand::{expand_word, suggest};
use crate::semantic::graph::StageGraph;
use crate::semantic::scope::VariableScope;
use crate::semantic::{
    BaseImageRef, ConstructionIssue, CopyFromRef, Model, ShellSetting, ShellSource, StageInfo,
    UndefinedVarRef,
};
use crate::shell::{extract_package_installs, ShellVariant};
use crate::source::SourceMap;

/// Default PATH seeded for stages based on external images; the real value
/// arrives later from the registry collaborator, if one runs.
const EXTERNAL_IMAGE_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// ONBUILD triggers Docker forbids.
const FORBIDDEN_ONBUILD: &[&str] = &["FROM", "MAINTAINER", "ONBUILD"];

/// Builds the model for one parsed file.
pub fn build_model(
    parse: &ParseResult,
    map: &SourceMap,
    build_args: &IndexMap<String, String>,
    shell_directives: &[ShellDirective],
) -> Model {
    let mut issues: Vec<ConstructionIssue> = Vec::new();

    let mut global_scope = VariableScope::new();
    for arg in parse.global_args() {
        global_scope.declare_arg(
            arg.name.content.clone(),
            arg.value.as_ref().map(|v| v.content.clone()),
            build_args.get(&arg.name.content).cloned(),
            line_of(map, arg.span.start),
        );
    }

    // instructions before the first FROM that are not global ARGs
    for ins in &parse.ast.instructions {
        match ins {
            Instruction::From(_) => break,
            Instruction::Arg(_) => {}
            other => {
                let (start, _) = instruction_span(other);
                issues.push(ConstructionIssue {
                    code: "hadolint/DL3061",
                    message: format!(
                        "`{}` before the first FROM; only ARG and comments may precede it",
                        crate::parse::instruction_kind(other)
                    ),
                    line: line_of(map, start),
                    stage: -1,
                });
            }
        }
    }

    let stages = parse.stages();
    let count = stages.stages.len();
    let mut graph = StageGraph::new(count);
    let mut names: IndexMap<String, usize> = IndexMap::new();
    let mut infos: Vec<StageInfo> = Vec::with_capacity(count);

    for stage in stages.iter() {
        let i = stage.index;
        let Some(Instruction::From(from)) = stage.instructions.first().copied() else {
            continue;
        };
        let from_line = line_of(map, from.span.start);

        if let Some(name) = &stage.name {
            if names.contains_key(name) {
                issues.push(ConstructionIssue {
                    code: "hadolint/DL3024",
                    message: format!("duplicate stage name `{name}`; names must be unique"),
                    line: from_line,
                    stage: i as i32,
                });
            } else {
                names.insert(name.clone(), i);
            }
        }

        // meta-ARGs may be substituted into FROM refs
        let global_lookup = |name: &str| {
            global_scope
                .resolve(name)
                .or_else(|| global_scope.is_declared(name).then(String::new))
        };
        let image_ref = expand_word(&from.image.content, &global_lookup).expanded;

        let base_key = image_ref.to_ascii_lowercase();
        let (is_stage_ref, base_index) = match names.get(&base_key) {
            Some(&base) if base != i => {
                graph.add_dependency(i, base);
                (true, base as i32)
            }
            _ => (false, -1),
        };

        let base = BaseImageRef {
            raw: image_ref,
            is_stage_ref,
            stage_index: base_index,
            platform: from_platform(from, map),
            line: from_line,
            span: (from.span.start, from.span.end),
        };

        let mut shell = shell_directives
            .iter()
            .filter(|d| d.line < from_line)
            .next_back()
            .map(|d| ShellSetting {
                argv: d.argv.clone(),
                variant: ShellVariant::from_shell_cmd(&d.argv),
                source: ShellSource::Directive,
            })
            .unwrap_or_default();

        let mut scope = VariableScope::new();
        let mut effective_env: IndexMap<String, String> = if is_stage_ref {
            infos[base_index as usize].effective_env.clone()
        } else if base.is_external_image() {
            IndexMap::from([("PATH".to_string(), EXTERNAL_IMAGE_PATH.to_string())])
        } else {
            IndexMap::new()
        };
        let mut undefined: Vec<UndefinedVarRef> = Vec::new();
        let mut copy_from: Vec<CopyFromRef> = Vec::new();
        let mut onbuild_copy_from: Vec<CopyFromRef> = Vec::new();
        let mut packages = Vec::new();
        let mut healthcheck_cmds = 0usize;

        for ins in stage.instructions.iter().skip(1).copied() {
            match ins {
                Instruction::Arg(arg) => {
                    let line = line_of(map, arg.span.start);
                    let name = arg.name.content.clone();
                    let default = match &arg.value {
                        Some(v) => Some(expand_collecting(
                            &v.content,
                            line,
                            &effective_env,
                            &scope,
                            &mut undefined,
                        )),
                        // redeclaring a global ARG pulls its value into scope
                        None => global_scope.arg(&name).and_then(|g| g.value().map(str::to_string)),
                    };
                    let overridden = build_args.get(&name).cloned();
                    scope.declare_arg(name, default, overridden, line);
                }
                Instruction::Env(env) => {
                    for var in &env.vars {
                        let line = line_of(map, var.key.span.start);
                        let value = expand_collecting(
                            &var.value.to_string(),
                            line,
                            &effective_env,
                            &scope,
                            &mut undefined,
                        );
                        scope.set_env(var.key.content.clone(), value.clone(), line);
                        effective_env.insert(var.key.content.clone(), value);
                    }
                }
                Instruction::Run(run) => {
                    if let Some(script) = run_script(run, map) {
                        for mut install in extract_package_installs(&script.text, shell.variant) {
                            install.line = script.file_position(install.line, 0).0;
                            packages.push(install);
                        }
                        collect_run_undefined(
                            &script,
                            shell.variant,
                            &effective_env,
                            &scope,
                            &mut undefined,
                        );
                    }
                }
                Instruction::Copy(copy) => {
                    let line = line_of(map, copy.span.start);
                    if let Some(flag) = copy.flags.iter().find(|f| f.name.content == "from") {
                        resolve_copy_from(
                            &flag.value.content,
                            i,
                            count,
                            line,
                            &names,
                            &mut graph,
                            &mut issues,
                            &mut copy_from,
                        );
                    }
                    for source in &copy.sources {
                        expand_collecting(&source.content, line, &effective_env, &scope, &mut undefined);
                    }
                    expand_collecting(
                        &copy.destination.content,
                        line,
                        &effective_env,
                        &scope,
                        &mut undefined,
                    );
                }
                Instruction::Label(label) => {
                    let line = line_of(map, label.span.start);
                    for entry in &label.labels {
                        expand_collecting(
                            &entry.value.content,
                            line,
                            &effective_env,
                            &scope,
                            &mut undefined,
                        );
                    }
                }
                Instruction::Misc(misc) => {
                    let kind = misc.instruction.content.to_uppercase();
                    let args_text = misc.arguments.to_string();
                    let args_text = args_text.trim();
                    let line = line_of(map, misc.span.start);
                    match kind.as_str() {
                        "SHELL" => {
                            let argv = parse_shell_argv(args_text);
                            shell = ShellSetting {
                                variant: ShellVariant::from_shell_cmd(&argv),
                                argv,
                                source: ShellSource::Instruction,
                            };
                        }
                        "ONBUILD" => {
                            process_onbuild(
                                args_text,
                                i,
                                line,
                                &names,
                                &mut issues,
                                &mut onbuild_copy_from,
                            );
                        }
                        "HEALTHCHECK" => {
                            let is_cmd = args_text
                                .split_whitespace()
                                .next()
                                .is_some_and(|w| w.eq_ignore_ascii_case("CMD"));
                            if is_cmd {
                                healthcheck_cmds += 1;
                                if healthcheck_cmds > 1 {
                                    issues.push(ConstructionIssue {
                                        code: "hadolint/DL3012",
                                        message: "multiple HEALTHCHECK instructions in one stage"
                                            .to_string(),
                                        line,
                                        stage: i as i32,
                                    });
                                }
                            }
                        }
                        "WORKDIR" | "USER" | "EXPOSE" | "ADD" | "VOLUME" | "STOPSIGNAL" => {
                            expand_collecting(args_text, line, &effective_env, &scope, &mut undefined);
                        }
                        _ => {}
                    }
                }
                // ONBUILD on forbidden kinds arrives as Misc; exec-form
                // instructions carry no variables worth approximating
                Instruction::From(_)
                | Instruction::Cmd(_)
                | Instruction::Entrypoint(_) => {}
            }
        }

        infos.push(StageInfo {
            index: i,
            name: stage.name.clone(),
            base,
            shell,
            scope,
            effective_env,
            undefined_vars: undefined,
            copy_from,
            onbuild_copy_from,
            packages,
            is_last: i + 1 == count,
            from_line,
        });
    }

    Model::new(infos, names, graph, issues, global_scope)
}

/// Value lookup with stage precedence: stage ENV/ARG, then declared-but-
/// valueless ARGs (defined, empty), then the inherited environment.
fn lookup_value(
    env: &IndexMap<String, String>,
    scope: &VariableScope,
    name: &str,
) -> Option<String> {
    scope
        .resolve(name)
        .or_else(|| scope.is_declared(name).then(String::new))
        .or_else(|| env.get(name).cloned())
}

/// Expands a word, recording any unmatched references with suggestions.
fn expand_collecting(
    input: &str,
    line: usize,
    env: &IndexMap<String, String>,
    scope: &VariableScope,
    undefined: &mut Vec<UndefinedVarRef>,
) -> String {
    let lookup = |name: &str| lookup_value(env, scope, name);
    let result = expand_word(input, &lookup);
    for name in result.unmatched {
        if undefined.iter().any(|u| u.name == name && u.line == line) {
            continue;
        }
        let suggestion = suggest(
            &name,
            env.keys().map(String::as_str).chain(scope.declared_names()),
        );
        undefined.push(UndefinedVarRef { name, line, suggestion });
    }
    result.expanded
}

/// Scans a RUN script line by line for unmatched references. Names assigned
/// anywhere within the script count as defined.
fn collect_run_undefined(
    script: &ScriptRef,
    variant: ShellVariant,
    env: &IndexMap<String, String>,
    scope: &VariableScope,
    undefined: &mut Vec<UndefinedVarRef>,
) {
    if variant.is_non_posix() {
        return;
    }

    let local_names = script_local_assignments(&script.text);
    let lookup = |name: &str| {
        if local_names.iter().any(|n| n == name) {
            return Some(String::new());
        }
        lookup_value(env, scope, name)
    };

    for (rel_line, text) in script.text.lines().enumerate() {
        let result = expand_word(text, &lookup);
        let file_line = script.file_position(rel_line, 0).0;
        for name in result.unmatched {
            if undefined.iter().any(|u| u.name == name && u.line == file_line) {
                continue;
            }
            let suggestion = suggest(
                &name,
                env.keys().map(String::as_str).chain(scope.declared_names()),
            );
            undefined.push(UndefinedVarRef { name, line: file_line, suggestion });
        }
    }
}

/// Names assigned (`X=…`) or bound by `for X in …` inside a script.
fn script_local_assignments(script: &str) -> Vec<String> {
    let mut names = Vec::new();
    let tokens = crate::shell::tokenize(script);
    let mut prev_was_for = false;
    for token in &tokens {
        if token.kind == crate::shell::TokenKind::Word {
            if prev_was_for {
                names.push(token.text.clone());
                prev_was_for = false;
                continue;
            }
            if token.text == "for" {
                prev_was_for = true;
                continue;
            }
            if let Some((name, _)) = token.text.split_once('=') {
                if !name.is_empty()
                    && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}

#[allow(clippy::too_many_arguments)]
fn resolve_copy_from(
    raw: &str,
    stage: usize,
    stage_count: usize,
    line: usize,
    names: &IndexMap<String, usize>,
    graph: &mut StageGraph,
    issues: &mut Vec<ConstructionIssue>,
    copy_from: &mut Vec<CopyFromRef>,
) {
    let trimmed = raw.trim();

    if let Ok(index) = trimmed.parse::<usize>() {
        if index < stage && index < stage_count {
            graph.add_dependency(stage, index);
            copy_from.push(CopyFromRef {
                raw: trimmed.to_string(),
                target: Some(index),
                external: false,
                line,
                onbuild: false,
            });
        } else {
            issues.push(ConstructionIssue {
                code: "hadolint/DL3022",
                message: format!(
                    "COPY --from={trimmed} does not reference a previously defined stage"
                ),
                line,
                stage: stage as i32,
            });
            copy_from.push(CopyFromRef {
                raw: trimmed.to_string(),
                target: None,
                external: false,
                line,
                onbuild: false,
            });
        }
        return;
    }

    match names.get(&trimmed.to_ascii_lowercase()) {
        Some(&target) if target == stage => {
            issues.push(ConstructionIssue {
                code: "hadolint/DL3023",
                message: format!("COPY --from={trimmed} references its own stage"),
                line,
                stage: stage as i32,
            });
            copy_from.push(CopyFromRef {
                raw: trimmed.to_string(),
                target: None,
                external: false,
                line,
                onbuild: false,
            });
        }
        Some(&target) => {
            graph.add_dependency(stage, target);
            copy_from.push(CopyFromRef {
                raw: trimmed.to_string(),
                target: Some(target),
                external: false,
                line,
                onbuild: false,
            });
        }
        None => {
            graph.add_external_ref(stage, trimmed);
            copy_from.push(CopyFromRef {
                raw: trimmed.to_string(),
                target: None,
                external: true,
                line,
                onbuild: false,
            });
        }
    }
}

/// Parses an ONBUILD trigger by reusing the Dockerfile parser on a minimal
/// wrapping. Forbidden triggers become issues; `COPY --from` refs are
/// recorded without graph edges.
fn process_onbuild(
    trigger: &str,
    stage: usize,
    line: usize,
    names: &IndexMap<String, usize>,
    issues: &mut Vec<ConstructionIssue>,
    onbuild_copy_from: &mut Vec<CopyFromRef>,
) {
    let Some(kind) = trigger.split_whitespace().next() else {
        return;
    };
    let kind = kind.to_uppercase();

    if FORBIDDEN_ONBUILD.contains(&kind.as_str()) {
        issues.push(ConstructionIssue {
            code: "hadolint/DL3043",
            message: format!("ONBUILD {kind} is not allowed"),
            line,
            stage: stage as i32,
        });
        return;
    }

    if kind != "COPY" {
        return;
    }

    let wrapped = format!("FROM scratch\n{trigger}\n");
    let Ok(parsed) = dockerfile_parser::Dockerfile::parse(&wrapped) else {
        return;
    };
    for ins in &parsed.instructions {
        if let Instruction::Copy(copy) = ins {
            if let Some(flag) = copy.flags.iter().find(|f| f.name.content == "from") {
                let raw = flag.value.content.trim().to_string();
                let target = names.get(&raw.to_ascii_lowercase()).copied();
                onbuild_copy_from.push(CopyFromRef {
                    external: target.is_none() && raw.parse::<usize>().is_err(),
                    raw,
                    target,
                    line,
                    onbuild: true,
                });
            }
        }
    }
}

/// `SHELL` arguments are a JSON array; fall back to whitespace splitting for
/// malformed input so the walk keeps going.
fn parse_shell_argv(args_text: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(args_text)
        .unwrap_or_else(|_| args_text.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ParseResult;
    use indoc::indoc;

    fn model(content: &str) -> Model {
        let map = SourceMap::new(content);
        let parse = ParseResult::parse(&map).unwrap();
        build_model(&parse, &map, &IndexMap::new(), &[])
    }

    fn model_with_args(content: &str, args: &[(&str, &str)]) -> Model {
        let map = SourceMap::new(content);
        let parse = ParseResult::parse(&map).unwrap();
        let build_args: IndexMap<String, String> =
            args.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        build_model(&parse, &map, &build_args, &[])
    }

    #[test]
    fn test_stage_indices_and_names() {
        let m = model(indoc! {r#"
            FROM golang:1.21 AS builder
            RUN go build -o /app

            FROM alpine:3.18
            COPY --from=builder /app /app
        "#});
        assert_eq!(m.stage_count(), 2);
        assert_eq!(m.stage_info(0).unwrap().name.as_deref(), Some("builder"));
        assert!(m.stage_info(1).unwrap().is_last);
        assert_eq!(m.stage_by_name("BUILDER").unwrap().index, 0);
    }

    #[test]
    fn test_duplicate_stage_names() {
        let m = model(indoc! {r#"
            FROM alpine AS build
            FROM alpine AS Build
            FROM alpine AS build
        "#});
        let duplicates: Vec<_> = m
            .construction_issues()
            .iter()
            .filter(|i| i.code == "hadolint/DL3024")
            .collect();
        // three declarations, one distinct name: two duplicates
        assert_eq!(duplicates.len(), 2);
    }

    #[test]
    fn test_from_stage_reference_builds_edge() {
        let m = model("FROM alpine AS base\nFROM base\nRUN true\n");
        assert!(m.stage_info(1).unwrap().base.is_stage_ref);
        assert_eq!(m.stage_info(1).unwrap().base.stage_index, 0);
        assert_eq!(m.graph().dependencies(1), [0]);
    }

    #[test]
    fn test_copy_from_self_reference() {
        let m = model(indoc! {r#"
            FROM alpine AS base
            COPY --from=base /a /b
        "#});
        let issue = &m.construction_issues()[0];
        assert_eq!(issue.code, "hadolint/DL3023");
        assert_eq!(issue.line, 1);
        assert!(m.graph().dependencies(0).is_empty());
    }

    #[test]
    fn test_copy_from_numeric_out_of_range() {
        let m = model(indoc! {r#"
            FROM alpine AS base
            FROM alpine
            COPY --from=5 /a /b
        "#});
        let issue = &m.construction_issues()[0];
        assert_eq!(issue.code, "hadolint/DL3022");
        assert!(m.graph().dependencies(1).is_empty());

        // forward numeric reference is also invalid
        let m = model("FROM alpine\nCOPY --from=0 /a /b\n");
        assert_eq!(m.construction_issues()[0].code, "hadolint/DL3022");
    }

    #[test]
    fn test_copy_from_external_image() {
        let m = model("FROM alpine\nCOPY --from=nginx:1.25 /etc/nginx /etc/nginx\n");
        assert!(m.construction_issues().is_empty());
        let info = m.stage_info(0).unwrap();
        assert!(info.copy_from[0].external);
        assert_eq!(m.graph().external_refs(0), ["nginx:1.25"]);
    }

    #[test]
    fn test_unreachable_stage() {
        let m = model(indoc! {r#"
            FROM golang:1.21 AS builder
            RUN go build -o /app

            FROM golang:1.21 AS unused
            RUN echo "this is never used"

            FROM alpine:3.18
            COPY --from=builder /app /app
        "#});
        assert_eq!(m.unreachable_stages(), [1]);
        assert_eq!(m.stage_info(1).unwrap().from_line, 3);
    }

    #[test]
    fn test_instruction_before_first_from() {
        let m = model("MAINTAINER me\nFROM alpine\n");
        let issue = &m.construction_issues()[0];
        assert_eq!(issue.code, "hadolint/DL3061");
        assert_eq!(issue.line, 0);
    }

    #[test]
    fn test_global_arg_not_visible_until_redeclared() {
        let m = model_with_args(
            indoc! {r#"
                ARG VERSION=1.0
                FROM alpine
                ARG VERSION
                ENV BUILD=$VERSION
            "#},
            &[],
        );
        assert_eq!(m.resolve_variable(0, "VERSION").as_deref(), Some("1.0"));
        assert_eq!(m.resolve_variable(0, "BUILD").as_deref(), Some("1.0"));

        let without = model("ARG VERSION=1.0\nFROM alpine\nENV BUILD=$VERSION\n");
        // VERSION never redeclared: reference is undefined inside the stage
        assert!(without
            .stage_info(0)
            .unwrap()
            .undefined_vars
            .iter()
            .any(|u| u.name == "VERSION"));
    }

    #[test]
    fn test_build_arg_override_beats_default() {
        let m = model_with_args(
            "ARG VERSION=1.0\nFROM alpine\nARG VERSION\n",
            &[("VERSION", "2.0")],
        );
        assert_eq!(m.resolve_variable(0, "VERSION").as_deref(), Some("2.0"));
    }

    #[test]
    fn test_env_beats_arg_in_resolution() {
        let m = model("FROM alpine\nARG X=arg\nENV X=env\n");
        assert_eq!(m.resolve_variable(0, "X").as_deref(), Some("env"));
    }

    #[test]
    fn test_meta_arg_expands_in_from() {
        let m = model("ARG TAG=3.18\nFROM alpine:${TAG}\n");
        assert_eq!(m.stage_info(0).unwrap().base.raw, "alpine:3.18");
    }

    #[test]
    fn test_effective_env_inherited_by_stage_base() {
        let m = model(indoc! {r#"
            FROM alpine AS base
            ENV APP_HOME=/srv

            FROM base
            RUN ls $APP_HOME
        "#});
        let child = m.stage_info(1).unwrap();
        assert_eq!(child.effective_env.get("APP_HOME").map(String::as_str), Some("/srv"));
        assert!(child.undefined_vars.is_empty());
    }

    #[test]
    fn test_external_base_seeds_path() {
        let m = model("FROM ubuntu:22.04\nRUN echo $PATH\n");
        let info = m.stage_info(0).unwrap();
        assert!(info.effective_env.contains_key("PATH"));
        assert!(info.undefined_vars.is_empty());
    }

    #[test]
    fn test_undefined_var_with_suggestion() {
        let m = model(indoc! {r#"
            FROM alpine
            ENV APP_VERSION=1.2.3
            RUN echo $APP_VERSON
        "#});
        let undefined = &m.stage_info(0).unwrap().undefined_vars;
        assert_eq!(undefined.len(), 1);
        assert_eq!(undefined[0].name, "APP_VERSON");
        assert_eq!(undefined[0].line, 2);
        assert_eq!(undefined[0].suggestion.as_deref(), Some("APP_VERSION"));
    }

    #[test]
    fn test_script_local_assignment_is_defined() {
        let m = model("FROM alpine\nRUN V=1 && echo $V && for f in a b; do echo $f; done\n");
        assert!(m.stage_info(0).unwrap().undefined_vars.is_empty());
    }

    #[test]
    fn test_shell_instruction_updates_variant() {
        let m = model(indoc! {r#"
            FROM mcr.microsoft.com/windows/servercore
            SHELL ["powershell", "-command"]
            RUN Get-ChildItem
        "#});
        let shell = &m.stage_info(0).unwrap().shell;
        assert_eq!(shell.source, ShellSource::Instruction);
        assert!(shell.variant.is_non_posix());
    }

    #[test]
    fn test_shell_directive_applies_to_following_stage() {
        let map = SourceMap::new(indoc! {r#"
            # hadolint shell=pwsh -command
            FROM mcr.microsoft.com/powershell
            RUN Get-Date
        "#});
        let parse = ParseResult::parse(&map).unwrap();
        let directives = crate::directives::parse_directives(&map, None);
        let m = build_model(&parse, &map, &IndexMap::new(), &directives.shell_directives);
        let shell = &m.stage_info(0).unwrap().shell;
        assert_eq!(shell.source, ShellSource::Directive);
        assert!(shell.variant.is_non_posix());
    }

    #[test]
    fn test_onbuild_forbidden_trigger() {
        let m = model("FROM alpine\nONBUILD FROM ubuntu\n");
        assert_eq!(m.construction_issues()[0].code, "hadolint/DL3043");
    }

    #[test]
    fn test_onbuild_copy_from_records_no_edge() {
        let m = model(indoc! {r#"
            FROM alpine AS tools
            FROM alpine
            ONBUILD COPY --from=tools /bin/tool /bin/tool
        "#});
        let info = m.stage_info(1).unwrap();
        assert_eq!(info.onbuild_copy_from.len(), 1);
        assert_eq!(info.onbuild_copy_from[0].target, Some(0));
        assert!(info.onbuild_copy_from[0].onbuild);
        // no edge: stage 0 stays unreachable
        assert_eq!(m.unreachable_stages(), [0]);
    }

    #[test]
    fn test_multiple_healthchecks() {
        let m = model(indoc! {r#"
            FROM alpine
            HEALTHCHECK CMD curl -f http://localhost/
            HEALTHCHECK CMD wget -q http://localhost/
        "#});
        let issue = &m.construction_issues()[0];
        assert_eq!(issue.code, "hadolint/DL3012");
        assert_eq!(issue.line, 2);
    }

    #[test]
    fn test_healthcheck_none_does_not_count() {
        let m = model("FROM alpine\nHEALTHCHECK NONE\nHEALTHCHECK CMD true\n");
        assert!(m.construction_issues().is_empty());
    }

    #[test]
    fn test_package_installs_collected() {
        let m = model("FROM ubuntu\nRUN apt-get update && apt-get install -y curl\n");
        let packages = &m.stage_info(0).unwrap().packages;
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].packages, ["curl"]);
        assert_eq!(packages[0].line, 1);
    }

    #[test]
    fn test_scratch_is_not_external() {
        let m = model("FROM scratch\nCOPY app /app\n");
        let base = &m.stage_info(0).unwrap().base;
        assert!(base.is_scratch());
        assert!(!base.is_external_image());
        assert_eq!(m.external_image_stages().count(), 0);
    }

    #[test]
    fn test_recheck_undefined_vars() {
        let m = model("FROM alpine\nRUN echo $JAVA_HOME\n");
        assert_eq!(m.stage_info(0).unwrap().undefined_vars.len(), 1);
        let resolved: IndexMap<String, String> =
            IndexMap::from([("JAVA_HOME".to_string(), "/usr/lib/jvm".to_string())]);
        assert!(m.recheck_undefined_vars(0, &resolved).is_empty());
        assert_eq!(m.recheck_undefined_vars(0, &IndexMap::new()).len(), 1);
    }
}
