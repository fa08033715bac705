//! echo — Print arguments to stdout.

use crate::result::ExecResult;
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

/// Echo builtin: `echo [-n] [arg ...]`.
pub struct Echo;

impl Builtin for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("echo", "Print arguments to standard output").usage("[-n] [arg ...]")
    }

    fn execute(&self, args: &[String], _ctx: &mut BuiltinContext<'_>) -> ExecResult {
        // Only a leading -n is an option; anything else prints as-is.
        let (newline, words) = match args.first().map(String::as_str) {
            Some("-n") => (false, &args[1..]),
            _ => (true, args),
        };

        let mut output = words.join(" ");
        if newline {
            output.push('\n');
        }
        ExecResult::success(output)
    }
}
