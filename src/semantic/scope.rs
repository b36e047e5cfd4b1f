//! ARG/ENV variable scopes with Docker resolution precedence.
//!
//! Resolution order inside a stage: ENV always wins over ARG; for ARGs a
//! build-arg override wins over the declared default. Global ARGs are not
//! visible inside a stage until the stage redeclares `ARG NAME`; the builder
//! performs that inheritance when it sees the redeclaration.

use indexmap::IndexMap;

/// One `ARG` declaration visible in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgEntry {
    pub name: String,
    /// Declared default, if any.
    pub default: Option<String>,
    /// Build-arg override supplied by the caller.
    pub overridden: Option<String>,
    /// 0-based declaration line.
    pub line: usize,
}

impl ArgEntry {
    /// The value an expansion sees: override, then default.
    pub fn value(&self) -> Option<&str> {
        self.overridden.as_deref().or(self.default.as_deref())
    }
}

/// One `ENV` assignment visible in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
    /// 0-based assignment line.
    pub line: usize,
}

/// An ordered ARG/ENV scope; the global scope holds meta-ARGs only.
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    args: IndexMap<String, ArgEntry>,
    envs: IndexMap<String, EnvEntry>,
}

impl VariableScope {
    pub fn new() -> Self {
        VariableScope::default()
    }

    pub fn declare_arg(
        &mut self,
        name: impl Into<String>,
        default: Option<String>,
        overridden: Option<String>,
        line: usize,
    ) {
        let name = name.into();
        self.args
            .insert(name.clone(), ArgEntry { name, default, overridden, line });
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>, line: usize) {
        let name = name.into();
        self.envs
            .insert(name.clone(), EnvEntry { name, value: value.into(), line });
    }

    /// Resolves a name to a value: ENV beats ARG, override beats default.
    ///
    /// An ARG declared without any value resolves to `None` even though it
    /// is declared; see [`VariableScope::is_declared`].
    pub fn resolve(&self, name: &str) -> Option<String> {
        if let Some(env) = self.envs.get(name) {
            return Some(env.value.clone());
        }
        self.args.get(name).and_then(|a| a.value().map(str::to_string))
    }

    /// Whether the name is declared at all; valueless ARGs count.
    pub fn is_declared(&self, name: &str) -> bool {
        self.envs.contains_key(name) || self.args.contains_key(name)
    }

    pub fn arg(&self, name: &str) -> Option<&ArgEntry> {
        self.args.get(name)
    }

    pub fn args(&self) -> impl Iterator<Item = &ArgEntry> {
        self.args.values()
    }

    pub fn envs(&self) -> impl Iterator<Item = &EnvEntry> {
        self.envs.values()
    }

    /// All declared names, ENV and ARG, in declaration order.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.envs.keys().map(String::as_str).chain(self.args.keys().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_beats_arg() {
        let mut scope = VariableScope::new();
        scope.declare_arg("NAME", Some("from-arg".into()), None, 0);
        scope.set_env("NAME", "from-env", 1);
        assert_eq!(scope.resolve("NAME").as_deref(), Some("from-env"));
    }

    #[test]
    fn test_override_beats_default() {
        let mut scope = VariableScope::new();
        scope.declare_arg("VERSION", Some("1.0".into()), Some("2.0".into()), 0);
        assert_eq!(scope.resolve("VERSION").as_deref(), Some("2.0"));
    }

    #[test]
    fn test_valueless_arg_is_declared_but_unresolved() {
        let mut scope = VariableScope::new();
        scope.declare_arg("TOKEN", None, None, 0);
        assert!(scope.is_declared("TOKEN"));
        assert_eq!(scope.resolve("TOKEN"), None);
    }

    #[test]
    fn test_undeclared_name() {
        let scope = VariableScope::new();
        assert!(!scope.is_declared("NOPE"));
        assert_eq!(scope.resolve("NOPE"), None);
    }

    #[test]
    fn test_redeclaration_replaces() {
        let mut scope = VariableScope::new();
        scope.declare_arg("V", Some("1".into()), None, 0);
        scope.declare_arg("V", Some("2".into()), None, 5);
        assert_eq!(scope.resolve("V").as_deref(), Some("2"));
        assert_eq!(scope.args().count(), 1);
    }
}
