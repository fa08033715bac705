//! Wait and foreground control.
//!
//! [`JobControl`] owns the job table together with everything that mutates
//! it: the reconciler, the terminal handle and the SIGHUP policy. Builtins
//! and the executor go through it rather than touching the table while
//! signals are unblocked.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgrp, Pid};

use super::job::{Job, JobId, JobStatus, Process, RawStatus};
use super::reconcile::{Reconciler, SystemWaiter, Waiter};
use super::table::{JobSlot, JobTable};
use crate::error::TerminalError;
use crate::result::EXIT_SUCCESS;
use crate::signal::{self, SignalGuard};
use crate::terminal::Terminal;

/// Called before the shell dies of SIGHUP, e.g. to flush history.
pub type HangupHook = Box<dyn FnMut()>;

pub struct JobControl {
    table: JobTable,
    reconciler: Reconciler,
    /// Present only while job control is enabled.
    terminal: Option<Terminal>,
    interactive: bool,
    hangup_hook: Option<HangupHook>,
}

impl JobControl {
    pub fn new(interactive: bool, terminal: Option<Terminal>) -> Self {
        Self::with_waiter(Box::new(SystemWaiter), interactive, terminal)
    }

    pub fn with_waiter(waiter: Box<dyn Waiter>, interactive: bool, terminal: Option<Terminal>) -> Self {
        Self {
            table: JobTable::new(),
            reconciler: Reconciler::new(waiter),
            terminal,
            interactive,
            hangup_hook: None,
        }
    }

    /// True if jobs get their own process groups and the terminal.
    pub fn job_control(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn terminal(&self) -> Option<&Terminal> {
        self.terminal.as_ref()
    }

    pub fn table(&self) -> &JobTable {
        &self.table
    }

    /// Mutable table access. Multi-step updates should hold a
    /// [`SignalGuard`] for their duration.
    pub fn table_mut(&mut self) -> &mut JobTable {
        &mut self.table
    }

    pub fn set_hangup_hook(&mut self, hook: impl FnMut() + 'static) {
        self.hangup_hook = Some(Box::new(hook));
    }

    /// Forget every job and give up the terminal. Run in a forked subshell.
    pub fn reset_for_subshell(&mut self) {
        self.table.clear();
        self.terminal = None;
        self.interactive = false;
        self.hangup_hook = None;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reconciliation and signal draining
    // ─────────────────────────────────────────────────────────────────────

    /// Run the reconciler once.
    pub fn reconcile(&mut self) {
        let _guard = SignalGuard::block();
        self.reconciler.do_wait(&mut self.table);
    }

    /// Act on pending signal flags. Safe to call at any loop boundary.
    ///
    /// SIGHUP ends the shell. SIGCHLD runs the reconciler. SIGINT is left
    /// set for the caller to look at.
    pub fn handle_signals(&mut self) {
        let _guard = SignalGuard::block();
        self.drain_signals();
    }

    /// Body of [`handle_signals`](Self::handle_signals); signals must
    /// already be blocked.
    fn drain_signals(&mut self) {
        if signal::sighup_pending() {
            self.hangup();
        }
        if signal::sigchld_pending() {
            self.reconciler.do_wait(&mut self.table);
            signal::clear_sigchld();
        }
    }

    /// Forward SIGHUP, run the hook, then die of SIGHUP ourselves.
    fn hangup(&mut self) -> ! {
        tracing::debug!(interactive = self.interactive, "hangup");
        signal::restore_default(Signal::SIGHUP);
        if self.interactive {
            self.broadcast_sighup();
        } else {
            // Our own group, the shell included; delivery waits for the unblock.
            let _ = kill(Pid::from_raw(0), Signal::SIGHUP);
        }
        if let Some(hook) = self.hangup_hook.as_mut() {
            hook();
        }
        signal::die_by_hangup()
    }

    /// Send SIGHUP to every job not marked nohup, and SIGCONT to those that
    /// are stopped so they can act on it.
    pub fn broadcast_sighup(&mut self) {
        let jobs = self.table.active().into_iter().chain(self.table.iter().map(|(_, j)| j));
        for job in jobs.filter(|job| !job.nohup) {
            if let Err(e) = send_signal(job, Signal::SIGHUP) {
                tracing::debug!(job = %job.name(), error = %e, "SIGHUP not delivered");
            }
            if job.status() == JobStatus::Stopped {
                let _ = send_signal(job, Signal::SIGCONT);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Waiting
    // ─────────────────────────────────────────────────────────────────────

    /// Block until the job in `slot` is Done, or Stopped if
    /// `return_on_stop` is set.
    ///
    /// With `interruptible`, a SIGINT aborts the wait and the return value
    /// is false; the SIGINT flag is left set. A slot that holds no job
    /// counts as finished.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn wait_for_job(&mut self, slot: JobSlot, return_on_stop: bool, interruptible: bool) -> bool {
        let guard = if interruptible {
            SignalGuard::block_interruptible()
        } else {
            SignalGuard::block()
        };
        self.reconciler.do_wait(&mut self.table);

        loop {
            self.drain_signals();

            let finished = match self.table.job(slot).map(Job::status) {
                None | Some(JobStatus::Done) => true,
                Some(JobStatus::Stopped) => return_on_stop,
                Some(JobStatus::Running) => false,
            };
            if finished {
                return true;
            }
            if interruptible && signal::interrupted() {
                return false;
            }
            guard.suspend();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Foreground and background
    // ─────────────────────────────────────────────────────────────────────

    /// Give the terminal to a job's group, if job control is on.
    pub fn give_terminal_to(&self, job: &Job) -> Result<(), TerminalError> {
        match (&self.terminal, job.pgid) {
            (Some(terminal), Some(pgid)) => terminal.give_to(pgid),
            _ => Ok(()),
        }
    }

    /// Take the terminal back for the shell. Failures are logged only.
    pub fn reclaim_terminal(&self) {
        if let Some(terminal) = &self.terminal {
            if let Err(e) = terminal.reclaim() {
                tracing::warn!("failed to reclaim terminal: {}", e);
            }
        }
    }

    /// Stop the shell itself until something continues it.
    ///
    /// With job control the shell first rejoins the group it started in,
    /// and takes the terminal again once resumed.
    pub fn suspend_shell(&mut self) -> Result<(), TerminalError> {
        tracing::debug!(job_control = self.job_control(), "suspending");
        match self.terminal.as_mut() {
            Some(terminal) => terminal.suspend(),
            None => killpg(getpgrp(), Signal::SIGSTOP).map_err(TerminalError::Os),
        }
    }

    /// Hand the terminal back to the process group the shell started in.
    pub fn restore_terminal(&mut self) {
        if let Some(terminal) = self.terminal.as_mut() {
            if let Err(e) = terminal.restore_original() {
                tracing::warn!("failed to restore original process group: {}", e);
            }
        }
    }

    /// Resume a numbered job, handing it the terminal first when it is
    /// going to the foreground.
    ///
    /// A stopped job gets SIGCONT and is marked running straight away so a
    /// following wait does not return on the stale stop.
    pub fn continue_job(&mut self, id: JobId, foreground: bool) -> Result<(), TerminalError> {
        let _guard = SignalGuard::block();
        let Some(job) = self.table.get(id) else {
            return Ok(());
        };
        if foreground {
            self.give_terminal_to(job)?;
        }
        if job.status() == JobStatus::Stopped {
            match send_signal(job, Signal::SIGCONT) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!(job = %id, error = %e, "SIGCONT failed"),
            }
        }
        if let Some(job) = self.table.get_mut(id) {
            job.mark_continued();
        }
        Ok(())
    }

    /// Settle a job after a foreground wait and return its exit status.
    ///
    /// A finished job leaves the table, with its death described on stderr
    /// when a signal other than SIGINT or SIGPIPE killed it. A stopped job
    /// keeps `changed` set so the next notification shows it; the active
    /// job gets a number first.
    pub fn finish_foreground(&mut self, slot: JobSlot) -> i32 {
        let _guard = SignalGuard::block();
        let Some(job) = self.table.job(slot) else {
            return EXIT_SUCCESS;
        };
        let status = job.exit_status();
        if job.status() != JobStatus::Done {
            if slot == JobSlot::Active {
                self.table.promote_active();
            }
            return status;
        }

        if let Some(message) = death_message(job) {
            eprintln!("{message}");
        }
        match slot {
            JobSlot::Active => {
                self.table.take_active();
            }
            JobSlot::Numbered(id) => {
                self.table.remove(id);
            }
        }
        status
    }

    /// Remove a job, returning it. Holds the signal mask while doing so.
    pub fn remove_job(&mut self, id: JobId) -> Option<Job> {
        let _guard = SignalGuard::block();
        self.table.remove(id)
    }

    /// Make `id` the current job.
    pub fn make_current(&mut self, id: JobId) {
        let _guard = SignalGuard::block();
        self.table.set_current(id);
    }

    /// Keep `id` in the table but skip it when SIGHUP is forwarded.
    pub fn mark_nohup(&mut self, id: JobId) {
        let _guard = SignalGuard::block();
        if let Some(job) = self.table.get_mut(id) {
            job.nohup = true;
        }
    }

    /// Any numbered job currently stopped.
    pub fn has_stopped_jobs(&self) -> bool {
        self.table.has_stopped()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reporting
    // ─────────────────────────────────────────────────────────────────────

    /// Reconcile, then describe every job whose status changed since it was
    /// last reported. Done jobs are removed after being described.
    pub fn notify(&mut self) -> Vec<String> {
        self.handle_signals();
        let _guard = SignalGuard::block();

        let changed: Vec<JobId> = self
            .table
            .iter()
            .filter(|(_, job)| job.changed)
            .map(|(id, _)| id)
            .collect();

        let mut lines = Vec::with_capacity(changed.len());
        for id in changed {
            if let Some(line) = format_job(&self.table, id, false) {
                lines.push(line);
            }
            self.settle_reported(id);
        }
        lines
    }

    /// After a job's status was shown: drop it if done, else clear `changed`.
    pub fn settle_reported(&mut self, id: JobId) {
        let _guard = SignalGuard::block();
        let Some(job) = self.table.get_mut(id) else {
            return;
        };
        if job.status() == JobStatus::Done {
            self.table.remove(id);
        } else {
            job.changed = false;
        }
    }
}

/// Send `signal` to a job: its whole group with job control, otherwise each
/// process that has not finished. `None` only checks that they exist.
pub fn send_signal<S: Into<Option<Signal>> + Copy>(job: &Job, signal: S) -> nix::Result<()> {
    if let Some(pgid) = job.pgid {
        return killpg(pgid, signal);
    }
    let mut result = Ok(());
    for process in job.processes.iter().filter(|p| p.status() != JobStatus::Done) {
        if let Some(pid) = process.pid {
            if let Err(e) = kill(pid, signal) {
                result = Err(e);
            }
        }
    }
    result
}

/// What to print when a foreground job was killed by a signal.
///
/// SIGINT and SIGPIPE deaths are expected and stay quiet.
pub fn death_message(job: &Job) -> Option<String> {
    match job.processes.last().map(Process::raw) {
        Some(RawStatus::Signaled { signal: sig, core_dumped })
            if !matches!(sig, Signal::SIGINT | Signal::SIGPIPE) =>
        {
            let text = signal::signal_description(sig);
            Some(if core_dumped {
                format!("{text} (core dumped)")
            } else {
                text.to_string()
            })
        }
        _ => None,
    }
}

/// One line (or, verbose, one line per process) describing a job:
///
/// ```text
/// [2] + Running              sleep 10 | cat
/// [2] +  4242 Running              sleep 10
///        4243 Running              | cat
/// ```
pub fn format_job(table: &JobTable, id: JobId, verbose: bool) -> Option<String> {
    let job = table.get(id)?;
    let marker = table.marker(id);
    if !verbose {
        return Some(format!("[{id}] {marker} {:<20} {}", job.status_text(), job.name()));
    }

    let pid_text = |pid: Option<Pid>| pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
    let mut lines = Vec::with_capacity(job.processes.len());
    for (i, process) in job.processes.iter().enumerate() {
        let status = process.raw().describe();
        if i == 0 {
            let lead = if job.looped { "| " } else { "" };
            lines.push(format!(
                "[{id}] {marker} {:>5} {status:<20} {lead}{}",
                pid_text(process.pid),
                process.name
            ));
        } else {
            lines.push(format!(
                "      {:>5} {status:<20} | {}",
                pid_text(process.pid),
                process.name
            ));
        }
    }
    Some(lines.join("\n"))
}
