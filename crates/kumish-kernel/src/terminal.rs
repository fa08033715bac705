//! Controlling terminal ownership.
//!
//! Only the foreground process group may read from the terminal. The shell
//! hands the terminal to a job before resuming it in the foreground and takes
//! it back once the job stops or finishes. On exit, and around `suspend`,
//! the shell goes back to the process group it was started in.

use std::os::fd::{FromRawFd, OwnedFd};

use nix::fcntl::{open, OFlag};
use nix::sys::signal::{killpg, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{getpgrp, getpid, setpgid, tcgetpgrp, tcsetpgrp, Pid};

use crate::error::TerminalError;

/// Handle on `/dev/tty` plus the shell's own process group.
#[derive(Debug)]
pub struct Terminal {
    fd: OwnedFd,
    shell_pgid: Pid,
    /// Group the shell was started in, handed back on exit.
    original_pgid: Pid,
}

impl Terminal {
    /// Open the controlling terminal.
    pub fn open() -> Result<Self, TerminalError> {
        let raw = open(
            "/dev/tty",
            OFlag::O_RDWR | OFlag::O_CLOEXEC | OFlag::O_NOCTTY,
            Mode::empty(),
        )
        .map_err(TerminalError::NoTerminal)?;
        // SAFETY: `open` just returned this descriptor and nothing else owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        let pgid = getpgrp();
        Ok(Self {
            fd,
            shell_pgid: pgid,
            original_pgid: pgid,
        })
    }

    pub fn shell_pgid(&self) -> Pid {
        self.shell_pgid
    }

    /// Process group currently in the foreground.
    pub fn foreground(&self) -> Result<Pid, TerminalError> {
        tcgetpgrp(&self.fd).map_err(TerminalError::Os)
    }

    /// Wait until the shell is in the foreground, then put it in its own
    /// process group and make that group the foreground one.
    ///
    /// A backgrounded shell stops itself here with SIGTTIN until a parent
    /// shell resumes it in the foreground. SIGTTIN has its default action
    /// for the duration, whatever the shell's disposition is.
    pub fn take_control(&mut self) -> Result<(), TerminalError> {
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        // SAFETY: SIG_DFL installs no code.
        let previous = unsafe { sigaction(Signal::SIGTTIN, &default) }.ok();
        let waited = self.wait_for_foreground();
        if let Some(previous) = previous {
            // SAFETY: puts back the action sigaction just returned.
            let _ = unsafe { sigaction(Signal::SIGTTIN, &previous) };
        }
        waited?;

        let pid = getpid();
        if getpgrp() != pid {
            setpgid(pid, pid).map_err(TerminalError::Os)?;
        }
        self.shell_pgid = pid;
        self.give_to(pid)
    }

    fn wait_for_foreground(&self) -> Result<(), TerminalError> {
        loop {
            let foreground = self.foreground()?;
            let own = getpgrp();
            if foreground == own {
                return Ok(());
            }
            tracing::debug!(foreground = %foreground, own = %own, "waiting to be foregrounded");
            killpg(own, Signal::SIGTTIN).map_err(TerminalError::Os)?;
        }
    }

    /// Rejoin the process group the shell was started in and give that
    /// group the terminal.
    pub fn restore_original(&mut self) -> Result<(), TerminalError> {
        if getpgrp() != self.original_pgid {
            setpgid(Pid::from_raw(0), self.original_pgid).map_err(TerminalError::Os)?;
        }
        self.shell_pgid = self.original_pgid;
        self.give_to(self.original_pgid)
    }

    /// Stop the shell's original group with SIGSTOP. Once continued in the
    /// foreground the shell takes the terminal back.
    pub fn suspend(&mut self) -> Result<(), TerminalError> {
        self.restore_original()?;
        let stopped = killpg(getpgrp(), Signal::SIGSTOP).map_err(TerminalError::Os);
        tracing::debug!(ok = stopped.is_ok(), "resumed after suspend");
        self.take_control()?;
        stopped
    }

    /// Make `pgid` the terminal's foreground process group.
    ///
    /// `EPERM`/`ESRCH` mean the group is gone and map to
    /// [`TerminalError::JobTerminated`].
    pub fn give_to(&self, pgid: Pid) -> Result<(), TerminalError> {
        let mut ttou = SigSet::empty();
        ttou.add(Signal::SIGTTOU);
        let previous = ttou.thread_swap_mask(SigmaskHow::SIG_BLOCK).ok();

        let result = tcsetpgrp(&self.fd, pgid).map_err(TerminalError::from);

        if let Some(previous) = previous {
            let _ = previous.thread_set_mask();
        }
        tracing::debug!(pgid = %pgid, ok = result.is_ok(), "terminal foreground group set");
        result
    }

    /// Give the terminal back to the shell.
    pub fn reclaim(&self) -> Result<(), TerminalError> {
        self.give_to(self.shell_pgid)
    }
}
