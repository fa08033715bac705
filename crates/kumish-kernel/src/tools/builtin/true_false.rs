//! true/false/: — Fixed exit status builtins.

use crate::result::{ExecResult, EXIT_FAILURE, EXIT_SUCCESS};
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

/// True builtin: always succeeds (exit code 0).
pub struct True;

impl Builtin for True {
    fn name(&self) -> &str {
        "true"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("true", "Exit with success (code 0)")
    }

    fn execute(&self, _args: &[String], _ctx: &mut BuiltinContext<'_>) -> ExecResult {
        ExecResult::status(EXIT_SUCCESS)
    }
}

/// False builtin: always fails (exit code 1).
pub struct False;

impl Builtin for False {
    fn name(&self) -> &str {
        "false"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("false", "Exit with failure (code 1)")
    }

    fn execute(&self, _args: &[String], _ctx: &mut BuiltinContext<'_>) -> ExecResult {
        ExecResult::status(EXIT_FAILURE)
    }
}

/// `:` — does nothing, successfully.
pub struct Colon;

impl Builtin for Colon {
    fn name(&self) -> &str {
        ":"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new(":", "Do nothing; exit with success").usage("[arguments]")
    }

    fn execute(&self, _args: &[String], _ctx: &mut BuiltinContext<'_>) -> ExecResult {
        ExecResult::status(EXIT_SUCCESS)
    }
}
