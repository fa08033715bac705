//! Job and process records.
//!
//! A [`Job`] is one pipeline invocation and owns its [`Process`]es. Process
//! state only changes through [`Process::set_raw`], called by the
//! reconciler; the job's aggregate [`JobStatus`] is recomputed from its
//! processes every time.

use std::fmt;

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::result::SIGNAL_OFFSET;

/// Stable job number, as used in `%N`. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub usize);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a process, and the aggregate state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Stopped => write!(f, "Stopped"),
            JobStatus::Done => write!(f, "Done"),
        }
    }
}

/// Last wait status reported for a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawStatus {
    /// Launched, nothing reported yet.
    Pending,
    Exited(i32),
    Signaled { signal: Signal, core_dumped: bool },
    Stopped(Signal),
    Continued,
}

impl RawStatus {
    /// Convert a wait report into the pid it concerns and its new status.
    ///
    /// Returns `None` for reports that carry no state change (`StillAlive`,
    /// ptrace events).
    pub fn from_wait(status: WaitStatus) -> Option<(Pid, RawStatus)> {
        match status {
            WaitStatus::Exited(pid, code) => Some((pid, RawStatus::Exited(code))),
            WaitStatus::Signaled(pid, signal, core_dumped) => Some((
                pid,
                RawStatus::Signaled {
                    signal,
                    core_dumped,
                },
            )),
            WaitStatus::Stopped(pid, signal) => Some((pid, RawStatus::Stopped(signal))),
            WaitStatus::Continued(pid) => Some((pid, RawStatus::Continued)),
            _ => None,
        }
    }

    /// Exited or killed ⇒ Done, stopped ⇒ Stopped, otherwise Running.
    pub fn state(&self) -> JobStatus {
        match self {
            RawStatus::Pending | RawStatus::Continued => JobStatus::Running,
            RawStatus::Stopped(_) => JobStatus::Stopped,
            RawStatus::Exited(_) | RawStatus::Signaled { .. } => JobStatus::Done,
        }
    }

    /// Status as shown by `jobs`.
    pub fn describe(&self) -> String {
        match self {
            RawStatus::Pending | RawStatus::Continued => "Running".to_string(),
            RawStatus::Stopped(signal) => format!("Stopped({signal})"),
            RawStatus::Exited(0) => "Done".to_string(),
            RawStatus::Exited(code) => format!("Done({code})"),
            RawStatus::Signaled {
                signal,
                core_dumped: true,
            } => format!("Killed ({signal}: core dumped)"),
            RawStatus::Signaled { signal, .. } => format!("Killed ({signal})"),
        }
    }

    /// Shell exit status: the exit code, or 128 + signal.
    pub fn exit_code(&self) -> i32 {
        match self {
            RawStatus::Exited(code) => *code,
            RawStatus::Signaled { signal, .. } | RawStatus::Stopped(signal) => {
                SIGNAL_OFFSET + *signal as i32
            }
            RawStatus::Pending | RawStatus::Continued => 0,
        }
    }
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    /// `None` for a builtin that ran in the shell without forking.
    pub pid: Option<Pid>,
    raw: RawStatus,
    /// Source text of the stage.
    pub name: String,
}

impl Process {
    /// A forked process that has not reported anything yet.
    pub fn forked(pid: Pid, name: impl Into<String>) -> Self {
        Self {
            pid: Some(pid),
            raw: RawStatus::Pending,
            name: name.into(),
        }
    }

    /// A stage that finished without a process of its own.
    pub fn finished(name: impl Into<String>, code: i32) -> Self {
        Self {
            pid: None,
            raw: RawStatus::Exited(code),
            name: name.into(),
        }
    }

    pub fn raw(&self) -> RawStatus {
        self.raw
    }

    pub fn status(&self) -> JobStatus {
        self.raw.state()
    }

    /// Record a new wait report. Callers must refresh the owning job.
    pub fn set_raw(&mut self, raw: RawStatus) {
        self.raw = raw;
    }
}

/// One pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Process group, `None` when job control is off and children share the
    /// shell's group.
    pub pgid: Option<Pid>,
    status: JobStatus,
    /// Status changed and the change has not been reported to the user.
    pub changed: bool,
    /// Skip this job when broadcasting SIGHUP at exit.
    pub nohup: bool,
    /// Last stage feeds the first.
    pub looped: bool,
    pub processes: Vec<Process>,
}

impl Job {
    pub fn new(looped: bool) -> Self {
        Self {
            pgid: None,
            status: JobStatus::Running,
            changed: false,
            nohup: false,
            looped,
            processes: Vec::new(),
        }
    }

    /// A job wrapping processes that are already known, e.g. a subshell.
    pub fn with_processes(processes: Vec<Process>, pgid: Option<Pid>) -> Self {
        let mut job = Self::new(false);
        job.processes = processes;
        job.pgid = pgid;
        job.refresh_status();
        job.changed = false;
        job
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Recompute the aggregate status from the processes.
    ///
    /// Running if any process runs, else Stopped if any is stopped, else
    /// Done. Sets `changed` and returns true if the aggregate moved.
    pub fn refresh_status(&mut self) -> bool {
        let statuses = || self.processes.iter().map(Process::status);
        let status = if statuses().any(|s| s == JobStatus::Running) {
            JobStatus::Running
        } else if statuses().any(|s| s == JobStatus::Stopped) {
            JobStatus::Stopped
        } else {
            JobStatus::Done
        };
        if status != self.status {
            self.status = status;
            self.changed = true;
            true
        } else {
            false
        }
    }

    /// Mark every stopped process as running again after SIGCONT.
    ///
    /// The change is made by the shell itself, so it is not flagged for
    /// reporting.
    pub fn mark_continued(&mut self) {
        for process in &mut self.processes {
            if process.status() == JobStatus::Stopped {
                process.set_raw(RawStatus::Continued);
            }
        }
        self.refresh_status();
        self.changed = false;
    }

    pub fn contains_pid(&self, pid: Pid) -> bool {
        self.processes.iter().any(|p| p.pid == Some(pid))
    }

    pub fn process_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.pid == Some(pid))
    }

    /// Pids of processes that were actually forked.
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.iter().filter_map(|p| p.pid)
    }

    /// Pid of the last forked process, `$!` for a background job.
    pub fn last_pid(&self) -> Option<Pid> {
        self.processes.iter().rev().find_map(|p| p.pid)
    }

    /// The group leader, or the first pid when there is no group.
    pub fn leader(&self) -> Option<Pid> {
        self.pgid.or_else(|| self.pids().next())
    }

    /// Display name: stage names joined with ` | `, with a leading `| ` for
    /// a loop pipeline.
    pub fn name(&self) -> String {
        let names: Vec<&str> = self.processes.iter().map(|p| p.name.as_str()).collect();
        let joined = names.join(" | ");
        if self.looped {
            format!("| {joined}")
        } else {
            joined
        }
    }

    /// The job's exit status.
    ///
    /// For a stopped job, 128 + the stop signal; otherwise the status of
    /// the last process.
    pub fn exit_status(&self) -> i32 {
        if self.status == JobStatus::Stopped {
            if let Some(p) = self.processes.iter().find(|p| p.status() == JobStatus::Stopped) {
                return p.raw.exit_code();
            }
        }
        self.processes.last().map(|p| p.raw.exit_code()).unwrap_or(0)
    }

    /// Signal that killed the last process, if any.
    pub fn terminating_signal(&self) -> Option<Signal> {
        match self.processes.last().map(Process::raw) {
            Some(RawStatus::Signaled { signal, .. }) => Some(signal),
            _ => None,
        }
    }

    /// Human-readable status: `Running`, `Stopped(SIGTSTP)`, `Done`,
    /// `Done(1)`, `Killed (SIGKILL)`, `Killed (SIGSEGV: core dumped)`.
    pub fn status_text(&self) -> String {
        let process = match self.status {
            JobStatus::Running => None,
            JobStatus::Stopped => self
                .processes
                .iter()
                .find(|p| p.status() == JobStatus::Stopped),
            JobStatus::Done => self.processes.last(),
        };
        match process {
            Some(p) => p.raw.describe(),
            None => self.status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    fn job_of(raws: &[RawStatus]) -> Job {
        let processes = raws
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut p = Process::forked(pid(100 + i as i32), format!("cmd{i}"));
                p.set_raw(*raw);
                p
            })
            .collect();
        Job::with_processes(processes, Some(pid(100)))
    }

    #[rstest]
    #[case(&[RawStatus::Pending, RawStatus::Exited(0)], JobStatus::Running)]
    #[case(&[RawStatus::Stopped(Signal::SIGTSTP), RawStatus::Continued], JobStatus::Running)]
    #[case(&[RawStatus::Stopped(Signal::SIGTSTP), RawStatus::Exited(0)], JobStatus::Stopped)]
    #[case(&[RawStatus::Exited(1), RawStatus::Signaled { signal: Signal::SIGPIPE, core_dumped: false }], JobStatus::Done)]
    #[case(&[], JobStatus::Done)]
    fn aggregate_status(#[case] raws: &[RawStatus], #[case] expected: JobStatus) {
        assert_eq!(job_of(raws).status(), expected);
    }

    #[test]
    fn every_update_sequence_keeps_the_aggregate_consistent() {
        let updates = [
            RawStatus::Stopped(Signal::SIGTSTP),
            RawStatus::Continued,
            RawStatus::Exited(0),
            RawStatus::Signaled {
                signal: Signal::SIGKILL,
                core_dumped: false,
            },
            RawStatus::Pending,
        ];
        // Two processes, every pair of updates applied in order.
        for a in updates {
            for b in updates {
                for target in 0..2 {
                    let mut job = job_of(&[RawStatus::Pending, RawStatus::Pending]);
                    job.processes[target].set_raw(a);
                    job.refresh_status();
                    job.processes[1 - target].set_raw(b);
                    job.refresh_status();

                    let states: Vec<_> = job.processes.iter().map(Process::status).collect();
                    let expected = if states.contains(&JobStatus::Running) {
                        JobStatus::Running
                    } else if states.contains(&JobStatus::Stopped) {
                        JobStatus::Stopped
                    } else {
                        JobStatus::Done
                    };
                    assert_eq!(job.status(), expected, "after {a:?} then {b:?}");
                }
            }
        }
    }

    #[test]
    fn refresh_flags_changes_only() {
        let mut job = job_of(&[RawStatus::Pending]);
        assert!(!job.changed);
        assert!(!job.refresh_status());
        job.processes[0].set_raw(RawStatus::Exited(0));
        assert!(job.refresh_status());
        assert!(job.changed);
    }

    #[test]
    fn exit_status_is_last_stage() {
        let job = job_of(&[RawStatus::Exited(1), RawStatus::Exited(0)]);
        assert_eq!(job.exit_status(), 0);
        let job = job_of(&[RawStatus::Exited(0), RawStatus::Exited(3)]);
        assert_eq!(job.exit_status(), 3);
    }

    #[test]
    fn signal_statuses_use_offset_128() {
        let killed = job_of(&[RawStatus::Signaled {
            signal: Signal::SIGKILL,
            core_dumped: false,
        }]);
        assert_eq!(killed.exit_status(), 137);
        let stopped = job_of(&[RawStatus::Stopped(Signal::SIGTSTP), RawStatus::Exited(0)]);
        assert_eq!(stopped.exit_status(), 148);
    }

    #[rstest]
    #[case(&[RawStatus::Pending], "Running")]
    #[case(&[RawStatus::Stopped(Signal::SIGTTIN)], "Stopped(SIGTTIN)")]
    #[case(&[RawStatus::Exited(0)], "Done")]
    #[case(&[RawStatus::Exited(2)], "Done(2)")]
    #[case(&[RawStatus::Signaled { signal: Signal::SIGTERM, core_dumped: false }], "Killed (SIGTERM)")]
    #[case(&[RawStatus::Signaled { signal: Signal::SIGSEGV, core_dumped: true }], "Killed (SIGSEGV: core dumped)")]
    fn status_text(#[case] raws: &[RawStatus], #[case] expected: &str) {
        assert_eq!(job_of(raws).status_text(), expected);
    }

    #[test]
    fn names() {
        let mut job = job_of(&[RawStatus::Pending, RawStatus::Pending]);
        assert_eq!(job.name(), "cmd0 | cmd1");
        job.looped = true;
        assert_eq!(job.name(), "| cmd0 | cmd1");
    }

    #[test]
    fn continuing_clears_stops_without_flagging() {
        let mut job = job_of(&[RawStatus::Stopped(Signal::SIGTSTP), RawStatus::Exited(0)]);
        job.mark_continued();
        assert_eq!(job.status(), JobStatus::Running);
        assert!(!job.changed);
    }

    #[test]
    fn from_wait_ignores_still_alive() {
        assert_eq!(RawStatus::from_wait(WaitStatus::StillAlive), None);
        assert_eq!(
            RawStatus::from_wait(WaitStatus::Exited(pid(5), 1)),
            Some((pid(5), RawStatus::Exited(1)))
        );
    }
}
