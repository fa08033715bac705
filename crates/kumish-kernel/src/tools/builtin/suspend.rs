//! suspend — Stop the shell until it is continued.

use crate::result::{ExecResult, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE};
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::{fail, parse_options};

/// Suspend builtin: `suspend [-f]`.
///
/// The shell rejoins the process group it was started in and stops that
/// group, so whatever started it sees it as a stopped job. An interactive
/// login shell refuses unless `-f` is given.
pub struct Suspend;

impl Builtin for Suspend {
    fn name(&self) -> &str {
        "suspend"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("suspend", "Stop the shell until it receives SIGCONT: -f even a login shell")
            .usage("[-f]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let args = match parse_options(&schema, args, "f") {
            Ok(args) => args,
            Err(result) => return result,
        };
        if let Some(extra) = args.positional.first() {
            return ExecResult::failure(
                EXIT_USAGE,
                format!("suspend: {extra}: invalid argument\n{}\n", schema.usage_line()),
            );
        }
        if ctx.state.interactive && ctx.state.login && !args.has('f') {
            return fail("suspend", "cannot suspend a login shell", "use -f to suspend anyway");
        }

        match ctx.jobs.suspend_shell() {
            Ok(()) => ExecResult::status(EXIT_SUCCESS),
            Err(e) => ExecResult::failure(EXIT_FAILURE, format!("suspend: {e}\n")),
        }
    }
}
