//! Execution context for builtins.

use crate::scheduler::JobControl;
use crate::state::ShellState;

/// What a builtin may touch: the jobs and the shell's own state.
pub struct BuiltinContext<'a> {
    pub jobs: &'a mut JobControl,
    pub state: &'a mut ShellState,
}

impl<'a> BuiltinContext<'a> {
    pub fn new(jobs: &'a mut JobControl, state: &'a mut ShellState) -> Self {
        Self { jobs, state }
    }
}
