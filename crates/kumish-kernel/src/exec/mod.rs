//! Process launcher and pipeline executor.
//!
//! A pipeline becomes one job. Every stage is forked into the job's process
//! group except a lone foreground builtin, which runs inside the shell so it
//! can change shell state (`cd`, `exit`, `fg`, ...).
//!
//! ```text
//!             pipe 0          pipe 1
//!  stage 0 ──────────▶ stage 1 ──────────▶ stage 2
//!     ▲                                       │
//!     └────────────── pipe 2 (looped) ────────┘
//! ```
//!
//! The child side of each fork never returns: it execs or exits.

mod redirect;

pub use redirect::{open_redirections, RedirectAction, RedirectSource};

use std::ffi::CString;
use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::libc;
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, execv, fork, getpid, pipe, setpgid, ForkResult, Pid};

use crate::ast::{AndOrList, Command, Connector, Pipeline};
use crate::error::{report, ExecError, RedirectError};
use crate::expand::{expand_word, expand_words};
use crate::paths::command_path;
use crate::result::{EXIT_FAILURE, EXIT_NOEXEC, EXIT_NOT_FOUND, EXIT_REDIRECT, EXIT_SUCCESS};
use crate::scheduler::{Job, JobControl, JobId, JobSlot, JobStatus, Process};
use crate::signal::{self, SignalGuard};
use crate::state::ShellState;
use crate::tools::{BuiltinContext, BuiltinRegistry};

/// Interpreter for files the kernel refuses to exec (`ENOEXEC`).
const FALLBACK_SHELL: &str = "/bin/sh";

/// What happened to a launched pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A builtin ran inside the shell.
    Inline { status: i32 },
    /// A foreground job ran to completion.
    Finished { status: i32 },
    /// A foreground job stopped and now has a number.
    Stopped { id: JobId, status: i32 },
    /// The job runs in the background.
    Background { id: JobId, pid: Option<Pid> },
}

impl LaunchOutcome {
    /// Exit status as seen by `$?`. Launching in the background succeeds.
    pub fn status(&self) -> i32 {
        match self {
            LaunchOutcome::Inline { status }
            | LaunchOutcome::Finished { status }
            | LaunchOutcome::Stopped { status, .. } => *status,
            LaunchOutcome::Background { .. } => EXIT_SUCCESS,
        }
    }
}

/// One stage with its words expanded, ready to fork.
struct Stage {
    argv: Vec<String>,
    redirects: Result<Vec<RedirectAction>, RedirectError>,
    name: String,
}

impl Stage {
    fn expand(command: &Command, state: &ShellState) -> Self {
        let redirects = command
            .redirects
            .iter()
            .map(|r| RedirectAction::from_ast(r, expand_word(&r.target, state)))
            .collect();
        Self {
            argv: expand_words(&command.words, state),
            redirects,
            name: command.text.clone(),
        }
    }
}

/// Pipes between stages. Pipe `i` carries stage `i`'s output to stage
/// `i + 1`; in a looped pipeline the last pipe wraps round to stage 0.
struct PipeSet {
    pipes: Vec<(OwnedFd, OwnedFd)>,
    stages: usize,
    looped: bool,
}

impl PipeSet {
    /// All or nothing: on failure the pipes already made are closed.
    fn create(stages: usize, looped: bool) -> Result<Self, ExecError> {
        let count = stages - 1 + usize::from(looped);
        let pipes = (0..count)
            .map(|_| pipe())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ExecError::Pipe)?;
        Ok(Self { pipes, stages, looped })
    }

    fn stdin_of(&self, stage: usize) -> Option<&OwnedFd> {
        let index = if stage > 0 {
            stage - 1
        } else if self.looped {
            self.stages - 1
        } else {
            return None;
        };
        self.pipes.get(index).map(|(read, _)| read)
    }

    fn stdout_of(&self, stage: usize) -> Option<&OwnedFd> {
        if stage + 1 < self.stages || self.looped {
            self.pipes.get(stage).map(|(_, write)| write)
        } else {
            None
        }
    }
}

/// Runs pipelines and and-or lists against the shell's jobs and state.
pub struct Launcher<'a> {
    jobs: &'a mut JobControl,
    builtins: &'a BuiltinRegistry,
    state: &'a mut ShellState,
    search_path: Option<&'a str>,
}

impl<'a> Launcher<'a> {
    pub fn new(
        jobs: &'a mut JobControl,
        builtins: &'a BuiltinRegistry,
        state: &'a mut ShellState,
        search_path: Option<&'a str>,
    ) -> Self {
        Self {
            jobs,
            builtins,
            state,
            search_path,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // And-or lists
    // ─────────────────────────────────────────────────────────────────────

    /// Run `a && b || c`, short-circuiting on each status. A background list
    /// of more than one pipeline runs in a forked subshell as one job.
    pub fn run_list(&mut self, list: &AndOrList) -> i32 {
        if list.background && !list.is_simple() {
            let status = match self.spawn_subshell(list) {
                Ok(outcome) => outcome.status(),
                Err(e) => {
                    report(&list.text(), &e);
                    EXIT_FAILURE
                }
            };
            self.state.last_status = status;
            return status;
        }

        let foreground = !list.background;
        let mut status = self.run_pipeline(&list.first, foreground);
        for (connector, pipeline) in &list.rest {
            if self.state.exit_request.is_some() {
                break;
            }
            let run = match connector {
                Connector::And => status == EXIT_SUCCESS,
                Connector::Or => status != EXIT_SUCCESS,
            };
            if run {
                status = self.run_pipeline(pipeline, foreground);
            }
        }
        status
    }

    fn run_pipeline(&mut self, pipeline: &Pipeline, foreground: bool) -> i32 {
        let status = match self.launch(pipeline, foreground) {
            Ok(outcome) => outcome.status(),
            Err(e) => {
                report(&pipeline.text(), &e);
                EXIT_FAILURE
            }
        };
        let status = if pipeline.negated && foreground {
            i32::from(status == EXIT_SUCCESS)
        } else {
            status
        };
        self.state.last_status = status;
        status
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pipelines
    // ─────────────────────────────────────────────────────────────────────

    /// Launch a pipeline as a job.
    ///
    /// In the foreground this returns once the job is done (or stopped,
    /// with job control). In the background it returns as soon as every
    /// stage is forked and the job has a number.
    #[tracing::instrument(level = "debug", skip_all, fields(pipeline = %pipeline.text(), foreground = foreground))]
    pub fn launch(&mut self, pipeline: &Pipeline, foreground: bool) -> Result<LaunchOutcome, ExecError> {
        let stages: Vec<Stage> = pipeline
            .commands
            .iter()
            .map(|command| Stage::expand(command, &*self.state))
            .collect();
        if stages.is_empty() {
            return Ok(LaunchOutcome::Inline { status: EXIT_SUCCESS });
        }

        if let Some(status) = self.try_inline(&stages, pipeline.looped, foreground) {
            return Ok(LaunchOutcome::Inline { status });
        }

        let pipes = PipeSet::create(stages.len(), pipeline.looped)?;
        flush_stdio();

        let guard = SignalGuard::block();
        self.jobs.table_mut().set_active(Job::new(pipeline.looped));
        let job_control = self.jobs.job_control();
        let mut pgid: Option<Pid> = None;

        for (index, stage) in stages.iter().enumerate() {
            // SAFETY: the child only sets up descriptors and signals, then
            // execs or exits; the shell is single-threaded.
            match unsafe { fork() } {
                Ok(ForkResult::Parent { child }) => {
                    if job_control {
                        let group = *pgid.get_or_insert(child);
                        // The child does the same; whichever runs first wins.
                        let _ = setpgid(child, group);
                    }
                    if let Some(job) = self.jobs.table_mut().active_mut() {
                        job.pgid = pgid;
                        job.processes.push(Process::forked(child, stage.name.clone()));
                    }
                    tracing::debug!(pid = %child, stage = index, "forked");
                }
                Ok(ForkResult::Child) => {
                    self.exec_stage(stage, &pipes, index, pgid, foreground);
                }
                Err(e) => {
                    report(&stage.name, &ExecError::Fork(e));
                    if let Some(job) = self.jobs.table_mut().active_mut() {
                        for stage in &stages[index..] {
                            job.processes.push(Process::finished(stage.name.clone(), EXIT_FAILURE));
                        }
                        job.refresh_status();
                    }
                    break;
                }
            }
        }
        drop(pipes);

        if !foreground {
            let outcome = self.background_started();
            drop(guard);
            return Ok(outcome);
        }
        drop(guard);
        Ok(self.wait_foreground())
    }

    /// Run a lone foreground builtin inside the shell. The job it leaves
    /// behind is already done and is cleared like any finished job.
    fn try_inline(&mut self, stages: &[Stage], looped: bool, foreground: bool) -> Option<i32> {
        let [stage] = stages else {
            return None;
        };
        if looped || !foreground || !matches!(&stage.redirects, Ok(r) if r.is_empty()) {
            return None;
        }
        let builtins = self.builtins;
        let builtin = builtins.get(stage.argv.first()?)?;

        let result = {
            let mut ctx = BuiltinContext::new(&mut *self.jobs, &mut *self.state);
            builtin.execute(&stage.argv[1..], &mut ctx)
        };
        result.emit();

        self.jobs.table_mut().set_active(Job::with_processes(
            vec![Process::finished(stage.name.clone(), result.code)],
            None,
        ));
        Some(self.jobs.finish_foreground(JobSlot::Active))
    }

    /// Hand the terminal to the new job and wait for it.
    fn wait_foreground(&mut self) -> LaunchOutcome {
        if let Some(job) = self.jobs.table().active() {
            if let Err(e) = self.jobs.give_terminal_to(job) {
                tracing::warn!("failed to give terminal to job: {}", e);
            }
        }

        let return_on_stop = self.jobs.job_control();
        self.jobs.wait_for_job(JobSlot::Active, return_on_stop, false);
        self.jobs.reclaim_terminal();

        let stopped = self
            .jobs
            .table()
            .active()
            .is_some_and(|job| job.status() == JobStatus::Stopped);
        let status = self.jobs.finish_foreground(JobSlot::Active);
        match (stopped, self.jobs.table().current()) {
            (true, Some(id)) => LaunchOutcome::Stopped { id, status },
            _ => LaunchOutcome::Finished { status },
        }
    }

    /// Give the active job a number and announce it.
    fn background_started(&mut self) -> LaunchOutcome {
        let pid = self.jobs.table().active().and_then(Job::last_pid);
        let Some(id) = self.jobs.table_mut().promote_active() else {
            return LaunchOutcome::Finished { status: EXIT_FAILURE };
        };
        self.state.last_bg_pid = pid;
        if self.jobs.interactive() {
            if let Some(pid) = pid {
                eprintln!("[{id}] {pid}");
            }
        }
        LaunchOutcome::Background { id, pid }
    }

    /// Fork a subshell that runs `list` in the foreground of its own
    /// process, registered here as a single background job.
    fn spawn_subshell(&mut self, list: &AndOrList) -> Result<LaunchOutcome, ExecError> {
        let name = format!("{{ {}; }}", list.text());
        flush_stdio();

        let guard = SignalGuard::block();
        let job_control = self.jobs.job_control();

        // SAFETY: as in `launch`; the child continues as a plain shell.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                let pgid = job_control.then_some(child);
                if let Some(pgid) = pgid {
                    let _ = setpgid(child, pgid);
                }
                self.jobs
                    .table_mut()
                    .set_active(Job::with_processes(vec![Process::forked(child, name)], pgid));
                let outcome = self.background_started();
                drop(guard);
                Ok(outcome)
            }
            Ok(ForkResult::Child) => {
                if job_control {
                    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                }
                signal::enter_subshell(!job_control);
                if !job_control {
                    stdin_from_dev_null();
                }
                self.jobs.reset_for_subshell();
                self.state.interactive = false;
                drop(guard);

                let foreground = AndOrList {
                    background: false,
                    ..list.clone()
                };
                let status = self.run_list(&foreground);
                flush_stdio();
                exit_child(status)
            }
            Err(e) => Err(ExecError::Fork(e)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Child side
    // ─────────────────────────────────────────────────────────────────────

    /// Everything a forked stage does before it becomes the command.
    fn exec_stage(&mut self, stage: &Stage, pipes: &PipeSet, index: usize, pgid: Option<Pid>, foreground: bool) -> ! {
        let job_control = self.jobs.job_control();
        if job_control {
            let pid = getpid();
            let group = pgid.unwrap_or(pid);
            let _ = setpgid(pid, group);
            if foreground {
                if let Some(terminal) = self.jobs.terminal() {
                    let _ = terminal.give_to(group);
                }
            }
        }

        signal::reset_for_child(!foreground && !job_control);

        let stdin = pipes.stdin_of(index).map(AsRawFd::as_raw_fd);
        let stdout = pipes.stdout_of(index).map(AsRawFd::as_raw_fd);
        if let Some(fd) = stdin {
            let _ = dup2(fd, libc::STDIN_FILENO);
        } else if !foreground && !job_control {
            stdin_from_dev_null();
        }
        if let Some(fd) = stdout {
            let _ = dup2(fd, libc::STDOUT_FILENO);
        }
        for (read, write) in &pipes.pipes {
            let _ = close(read.as_raw_fd());
            let _ = close(write.as_raw_fd());
        }

        let applied = match &stage.redirects {
            Ok(actions) => open_redirections(actions),
            Err(e) => Err(e.clone()),
        };
        if let Err(e) = applied {
            report(redirect_context(&stage.argv), &e);
            exit_child(EXIT_REDIRECT);
        }

        let Some(program) = stage.argv.first() else {
            exit_child(EXIT_SUCCESS);
        };

        let builtins = self.builtins;
        if let Some(builtin) = builtins.get(program) {
            self.jobs.reset_for_subshell();
            self.state.interactive = false;
            let result = {
                let mut ctx = BuiltinContext::new(&mut *self.jobs, &mut *self.state);
                builtin.execute(&stage.argv[1..], &mut ctx)
            };
            result.emit();
            exit_child(result.code);
        }

        let Some(path) = command_path(program, self.search_path) else {
            report(program, &"command not found");
            exit_child(EXIT_NOT_FOUND);
        };
        exec_program(&path.to_string_lossy(), &stage.argv)
    }
}

/// Replace the process image, falling back to `/bin/sh` for files without
/// a recognised format.
fn exec_program(path: &str, argv: &[String]) -> ! {
    let (Ok(c_path), Ok(c_argv)) = (CString::new(path), to_cstrings(argv)) else {
        report(path, &"argument contains a NUL byte");
        exit_child(EXIT_NOEXEC);
    };

    let errno = match execv(&c_path, &c_argv) {
        Ok(never) => match never {},
        Err(errno) => errno,
    };

    if errno == Errno::ENOEXEC {
        let mut fallback = vec![FALLBACK_SHELL.to_string(), path.to_string()];
        fallback.extend(argv.iter().skip(1).cloned());
        if let (Ok(sh), Ok(sh_argv)) = (CString::new(FALLBACK_SHELL), to_cstrings(&fallback)) {
            let _ = execv(&sh, &sh_argv);
        }
    }

    report(path, &errno.desc());
    exit_child(if errno == Errno::ENOENT {
        EXIT_NOT_FOUND
    } else {
        EXIT_NOEXEC
    })
}

/// Diagnostic prefix for a failed redirection: the command, or `redirect`
/// for a command made of redirections only.
fn redirect_context(argv: &[String]) -> &str {
    argv.first().map_or("redirect", String::as_str)
}

fn to_cstrings(args: &[String]) -> Result<Vec<CString>, std::ffi::NulError> {
    args.iter().map(|a| CString::new(a.as_str())).collect()
}

fn stdin_from_dev_null() {
    if let Ok(fd) = open("/dev/null", OFlag::O_RDONLY, Mode::empty()) {
        if fd != libc::STDIN_FILENO {
            let _ = dup2(fd, libc::STDIN_FILENO);
            let _ = close(fd);
        }
    }
}

/// Buffered output must not be duplicated into children.
fn flush_stdio() {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}

/// Leave a forked child without running the parent's exit hooks.
fn exit_child(code: i32) -> ! {
    // SAFETY: _exit is async-signal-safe and never returns.
    unsafe { libc::_exit(code) }
}
