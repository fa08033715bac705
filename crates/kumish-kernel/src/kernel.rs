//! The Kernel — parses and runs kumish source.
//!
//! This is the primary interface for embedding the shell. It owns all
//! runtime state: the job table, the builtins and the session state. The
//! REPL and the `-c`/script runner both drive it the same way:
//!
//! ```text
//! loop {
//!     for line in kernel.notify_changes() { eprintln!("{line}") }
//!     let source = read();
//!     kernel.execute(&source)?;
//!     if kernel.exit_requested().is_some() { break }
//! }
//! kernel.shutdown();
//! ```

use crate::ast::Program;
use crate::config::KernelConfig;
use crate::error::{report, ParseError};
use crate::exec::Launcher;
use crate::parser::parse;
use crate::scheduler::JobControl;
use crate::signal;
use crate::state::ShellState;
use crate::terminal::Terminal;
use crate::tools::BuiltinRegistry;

/// The Kernel — executes kumish code.
pub struct Kernel {
    config: KernelConfig,
    jobs: JobControl,
    builtins: BuiltinRegistry,
    state: ShellState,
}

impl Kernel {
    /// Create a kernel, installing signal handlers and, if configured,
    /// taking the controlling terminal for job control.
    ///
    /// Without a usable terminal job control is reported and turned off;
    /// the shell still runs.
    pub fn new(config: KernelConfig) -> Self {
        signal::install(config.interactive);

        let terminal = if config.job_control {
            match open_terminal() {
                Ok(terminal) => Some(terminal),
                Err(e) => {
                    report("cannot enable job control", &e);
                    None
                }
            }
        } else {
            None
        };

        let jobs = JobControl::new(config.interactive, terminal);
        Self::with_jobs(config, jobs)
    }

    /// Assemble a kernel around existing job control, leaving signal
    /// dispositions and the terminal alone.
    pub fn with_jobs(config: KernelConfig, jobs: JobControl) -> Self {
        let mut state = ShellState::new(config.name.clone(), config.interactive);
        state.login = config.login;
        tracing::debug!(
            name = %config.name,
            interactive = config.interactive,
            job_control = jobs.job_control(),
            "kernel ready"
        );
        Self {
            config,
            jobs,
            builtins: BuiltinRegistry::with_defaults(),
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn interactive(&self) -> bool {
        self.config.interactive
    }

    /// True if jobs get process groups and the terminal.
    pub fn job_control(&self) -> bool {
        self.jobs.job_control()
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Status of the last pipeline, `$?`.
    pub fn last_status(&self) -> i32 {
        self.state.last_status
    }

    /// Status requested by `exit`, once it has run.
    pub fn exit_requested(&self) -> Option<i32> {
        self.state.exit_request
    }

    // ─────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────

    /// Parse and run `source`. Returns the status of the last pipeline run.
    ///
    /// A syntax error runs nothing and sets `$?` to 2. Execution stops early
    /// once `exit` has been requested.
    pub fn execute(&mut self, source: &str) -> Result<i32, ParseError> {
        signal::clear_interrupt();
        let program = match parse(source) {
            Ok(program) => program,
            Err(e) => {
                self.state.last_status = crate::result::EXIT_USAGE;
                return Err(e);
            }
        };
        Ok(self.run(&program))
    }

    /// Run an already parsed program.
    pub fn run(&mut self, program: &Program) -> i32 {
        for list in &program.lists {
            let warned = self.state.exit_warned;

            let mut launcher = Launcher::new(
                &mut self.jobs,
                &self.builtins,
                &mut self.state,
                self.config.path_override.as_deref(),
            );
            launcher.run_list(list);

            // A second `exit` right after the warning goes through; anything
            // else in between re-arms it.
            if warned && self.state.exit_request.is_none() {
                self.state.exit_warned = false;
            }
            self.jobs.handle_signals();
            if self.state.exit_request.is_some() {
                break;
            }
        }
        self.state.last_status
    }

    // ─────────────────────────────────────────────────────────────────────
    // Jobs
    // ─────────────────────────────────────────────────────────────────────

    /// Drain pending signals. SIGHUP does not return.
    pub fn handle_signals(&mut self) {
        self.jobs.handle_signals();
    }

    /// Lines describing jobs that changed since the last call. Done jobs are
    /// removed once described.
    pub fn notify_changes(&mut self) -> Vec<String> {
        self.jobs.notify()
    }

    pub fn has_stopped_jobs(&mut self) -> bool {
        self.jobs.reconcile();
        self.jobs.has_stopped_jobs()
    }

    /// Run `hook` before the shell dies of SIGHUP.
    pub fn set_hangup_hook(&mut self, hook: impl FnMut() + 'static) {
        self.jobs.set_hangup_hook(hook);
    }

    /// Normal exit. With `hup_on_exit` in an interactive shell, jobs not
    /// marked nohup get SIGHUP. The terminal goes back to the process group
    /// the shell started in.
    pub fn shutdown(&mut self) {
        self.jobs.reconcile();
        if self.config.interactive && self.config.hup_on_exit {
            tracing::debug!(jobs = self.jobs.table().len(), "hanging up jobs on exit");
            self.jobs.broadcast_sighup();
        }
        self.jobs.restore_terminal();
    }
}

fn open_terminal() -> Result<Terminal, crate::error::TerminalError> {
    let mut terminal = Terminal::open()?;
    terminal.take_control()?;
    Ok(terminal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::ScriptedWaiter;
    use rstest::rstest;

    // Only inline builtins run here: forking from the test harness is left
    // to the binary's integration tests.
    fn kernel(interactive: bool) -> Kernel {
        let jobs = JobControl::with_waiter(Box::new(ScriptedWaiter::default()), interactive, None);
        Kernel::with_jobs(KernelConfig::non_interactive().with_interactive(interactive), jobs)
    }

    #[rstest]
    #[case("true", 0)]
    #[case("false", 1)]
    #[case("! true", 1)]
    #[case("! false", 0)]
    #[case("false || true", 0)]
    #[case("true && false", 1)]
    #[case("false && true", 1)]
    #[case("false; true", 0)]
    #[case("true; false", 1)]
    #[case(":", 0)]
    fn statuses(#[case] source: &str, #[case] expected: i32) {
        let mut kernel = kernel(false);
        assert_eq!(kernel.execute(source), Ok(expected));
        assert_eq!(kernel.last_status(), expected);
    }

    #[test]
    fn exit_stops_execution() {
        let mut kernel = kernel(false);
        assert_eq!(kernel.execute("exit 3; false"), Ok(3));
        assert_eq!(kernel.exit_requested(), Some(3));
    }

    #[test]
    fn exit_inside_a_chain_ends_it() {
        let mut kernel = kernel(false);
        kernel.execute("true && exit 4 || false").expect("parses");
        assert_eq!(kernel.exit_requested(), Some(4));
        assert_eq!(kernel.last_status(), 4);
    }

    #[test]
    fn syntax_error_runs_nothing() {
        let mut kernel = kernel(false);
        assert!(kernel.execute("exit 5; | x").is_err());
        assert_eq!(kernel.exit_requested(), None);
        assert_eq!(kernel.last_status(), 2);
    }

    #[test]
    fn status_is_visible_to_the_next_command() {
        let mut kernel = kernel(false);
        kernel.execute("false").expect("parses");
        assert_eq!(kernel.execute("exit $?"), Ok(1));
    }

    #[test]
    fn no_jobs_means_nothing_to_notify() {
        let mut kernel = kernel(true);
        assert!(kernel.notify_changes().is_empty());
        assert!(!kernel.has_stopped_jobs());
    }
}
