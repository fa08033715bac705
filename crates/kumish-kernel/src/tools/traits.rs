//! Core builtin traits and types.

use crate::result::ExecResult;

use super::context::BuiltinContext;

/// Schema describing a builtin's interface, for `help`-style listings and
/// usage errors.
#[derive(Debug, Clone)]
pub struct BuiltinSchema {
    /// Builtin name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Synopsis without the name, e.g. `[-lnprs] [jobspec ...]`.
    pub usage: String,
}

impl BuiltinSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            usage: String::new(),
        }
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// `name: usage: name synopsis`, as printed on a usage error.
    pub fn usage_line(&self) -> String {
        if self.usage.is_empty() {
            format!("{name}: usage: {name}", name = self.name)
        } else {
            format!("{name}: usage: {name} {}", self.usage, name = self.name)
        }
    }
}

/// A command run by the shell itself rather than by exec.
///
/// Builtins return their output in the [`ExecResult`] instead of writing
/// it; the caller emits it. Inside a forked pipeline stage the result is
/// emitted and the child exits with its code.
pub trait Builtin {
    /// The builtin's name (used for lookup).
    fn name(&self) -> &str;

    fn schema(&self) -> BuiltinSchema;

    /// `args` excludes the command name.
    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult;
}
