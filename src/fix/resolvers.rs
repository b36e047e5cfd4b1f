//! Deferred fix resolvers.
//!
//! A resolver is keyed by a stable string id and recomputes its edits
//! against the *current* modified content, after lower-priority fixes have
//! already been applied. Returning zero edits means the text already
//! reached the desired state; that is a success.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Once, RwLock};

use dockerfile_parser::{Dockerfile, Instruction, ShellOrExecExpr};
use once_cell::sync::Lazy;

use crate::rules::tally::HEREDOC_RESOLVER_ID;
use crate::shell::{extract_chained_commands, ShellVariant};
use crate::source::SourceMap;
use crate::violations::{TextEdit, TextRange};

/// Recomputes a deferred fix's edits against current content. Edits are
/// returned in the coordinates of `content`, not of the original file.
pub trait FixResolver: Send + Sync {
    fn resolve(
        &self,
        path: &Path,
        content: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<TextEdit>, String>;
}

static RESOLVERS: Lazy<RwLock<HashMap<String, Arc<dyn FixResolver>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub fn register_resolver(id: impl Into<String>, resolver: Arc<dyn FixResolver>) {
    RESOLVERS
        .write()
        .expect("resolver registry poisoned")
        .entry(id.into())
        .or_insert(resolver);
}

pub fn find_resolver(id: &str) -> Option<Arc<dyn FixResolver>> {
    RESOLVERS.read().expect("resolver registry poisoned").get(id).cloned()
}

static INSTALL: Once = Once::new();

/// Installs the built-in resolvers; later calls are no-ops.
pub fn install_builtin_resolvers() {
    INSTALL.call_once(|| {
        register_resolver(HEREDOC_RESOLVER_ID, Arc::new(HeredocResolver));
    });
}

/// Rewrites the n-th shell-form RUN of the file as a heredoc script.
///
/// The ordinal comes from the emitting rule; content-level fixes applied
/// before this resolver may have changed the script text, so the chain is
/// re-split from the current content.
struct HeredocResolver;

impl FixResolver for HeredocResolver {
    fn resolve(
        &self,
        path: &Path,
        content: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<TextEdit>, String> {
        let run_index = data
            .get("run_index")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| "heredoc resolver data is missing `run_index`".to_string())?
            as usize;

        let ast = Dockerfile::parse(content)
            .map_err(|e| format!("modified content no longer parses: {e}"))?;
        let map = SourceMap::new(content);

        let run = ast
            .instructions
            .iter()
            .filter_map(|ins| match ins {
                Instruction::Run(r) => match &r.expr {
                    ShellOrExecExpr::Shell(_) => Some(r),
                    ShellOrExecExpr::Exec(_) => None,
                },
                _ => None,
            })
            .nth(run_index)
            .ok_or_else(|| format!("shell RUN #{run_index} no longer exists"))?;

        let script = crate::parse::run_script(run, &map)
            .ok_or_else(|| "RUN lost its shell script".to_string())?;

        // a previous pass may already have rewritten it
        if script.text.contains("<<") {
            return Ok(Vec::new());
        }
        let commands = extract_chained_commands(&script.text, ShellVariant::Posix);
        if commands.len() < 2 {
            return Ok(Vec::new());
        }

        let mut body = String::from("RUN <<EOF\nset -e\n");
        for command in &commands {
            body.push_str(command);
            body.push('\n');
        }
        body.push_str("EOF");

        let (start_line, start_col) = map.position(run.span.start);
        let (end_line, end_col) = map.position(run.span.end);
        Ok(vec![TextEdit {
            file: path.to_path_buf(),
            range: TextRange::new(start_line + 1, start_col, end_line + 1, end_col),
            replacement: body,
        }])
    }
}
