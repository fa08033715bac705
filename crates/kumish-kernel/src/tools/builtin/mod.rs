//! Built-in commands for kumish.
//!
//! The job-control builtins (`jobs`, `fg`, `bg`, `disown`, `kill`, `wait`,
//! `suspend`) work on the shell's own job table and must run in the shell
//! process.
//! The rest are the handful of trivial commands a session needs.

mod bg;
mod cd;
mod disown;
mod echo;
mod exit;
mod fg;
mod jobs;
mod kill;
mod pwd;
mod suspend;
mod true_false;
mod wait;

use crate::result::{ExecResult, EXIT_FAILURE, EXIT_USAGE};

use super::args::BuiltinArgs;
use super::traits::BuiltinSchema;
use super::BuiltinRegistry;

/// Register all built-in commands with the registry.
pub fn register_builtins(registry: &mut BuiltinRegistry) {
    registry.register(bg::Bg);
    registry.register(cd::Cd);
    registry.register(disown::Disown);
    registry.register(echo::Echo);
    registry.register(exit::Exit);
    registry.register(fg::Fg);
    registry.register(jobs::Jobs);
    registry.register(kill::Kill);
    registry.register(pwd::Pwd);
    registry.register(suspend::Suspend);
    registry.register(true_false::True);
    registry.register(true_false::False);
    registry.register(true_false::Colon);
    registry.register(wait::Wait);
}

/// Parse options, turning a bad option into the usage error result.
fn parse_options(schema: &BuiltinSchema, args: &[String], optstring: &str) -> Result<BuiltinArgs, ExecResult> {
    BuiltinArgs::parse(args, optstring).map_err(|e| {
        ExecResult::failure(
            EXIT_USAGE,
            format!("{}: {e}\n{}\n", schema.name, schema.usage_line()),
        )
    })
}

/// Usage error: synopsis on stderr, usage status.
fn usage(schema: &BuiltinSchema) -> ExecResult {
    ExecResult::failure(EXIT_USAGE, format!("{}\n", schema.usage_line()))
}

/// `name: context: message` on stderr with status 1.
fn fail(name: &str, context: &str, message: impl std::fmt::Display) -> ExecResult {
    ExecResult::failure(EXIT_FAILURE, format!("{name}: {context}: {message}\n"))
}
