//! exit — Leave the shell.

use crate::result::{ExecResult, EXIT_FAILURE, EXIT_USAGE};
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::{parse_options, usage};

/// Exit builtin: `exit [-f] [status]`.
///
/// Records an exit request in the shell state; the caller stops reading
/// commands once one is present. An interactive shell with stopped jobs
/// refuses once with a warning, unless `-f` is given.
pub struct Exit;

impl Builtin for Exit {
    fn name(&self) -> &str {
        "exit"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("exit", "Exit the shell; -f ignores stopped jobs").usage("[-f] [status]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let args = match parse_options(&schema, args, "f") {
            Ok(args) => args,
            Err(result) => return result,
        };
        if args.positional.len() > 1 {
            return usage(&schema);
        }

        let code = match args.positional.first() {
            None => ctx.state.last_status,
            Some(text) => match text.parse::<i32>() {
                Ok(code) => code & 0xff,
                Err(_) => {
                    ctx.state.exit_request = Some(EXIT_USAGE);
                    return ExecResult::failure(EXIT_USAGE, format!("exit: {text}: numeric argument required\n"));
                }
            },
        };

        if ctx.state.interactive && !args.has('f') && !ctx.state.exit_warned {
            ctx.jobs.reconcile();
            if ctx.jobs.has_stopped_jobs() {
                ctx.state.exit_warned = true;
                return ExecResult::failure(EXIT_FAILURE, "There are stopped jobs!\n");
            }
        }

        ctx.state.exit_request = Some(code);
        ExecResult::status(code)
    }
}
