//! The reconciler: drains pending child status reports into the job table.
//!
//! Never blocks. Callers hold a [`SignalGuard`](crate::signal::SignalGuard)
//! so that no SIGCHLD handler runs halfway through an update.

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

use super::job::RawStatus;
use super::table::JobTable;
use crate::error::{report, ExecError};

/// Source of child status reports.
///
/// The production implementation is [`SystemWaiter`]; tests script the
/// reports instead so no real `waitpid(-1)` runs inside the test harness.
pub trait Waiter {
    /// Ask for the status of any child with the given flags.
    fn wait_any(&mut self, flags: WaitPidFlag) -> nix::Result<WaitStatus>;
}

/// `waitpid(-1, ...)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWaiter;

impl Waiter for SystemWaiter {
    fn wait_any(&mut self, flags: WaitPidFlag) -> nix::Result<WaitStatus> {
        waitpid(None, Some(flags))
    }
}

/// Non-blocking reap loop over a [`Waiter`].
pub struct Reconciler {
    waiter: Box<dyn Waiter>,
    /// Cleared permanently if the OS rejects `WCONTINUED`.
    report_continued: bool,
}

impl Reconciler {
    pub fn new(waiter: Box<dyn Waiter>) -> Self {
        Self {
            waiter,
            report_continued: true,
        }
    }

    fn flags(&self) -> WaitPidFlag {
        let mut flags = WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG;
        if self.report_continued {
            flags |= WaitPidFlag::WCONTINUED;
        }
        flags
    }

    /// Reap every pending status change and apply it to `table`.
    ///
    /// Stops at the first empty poll or `ECHILD`. `EINTR` retries; `EINVAL`
    /// while asking for continued reports retries without them. Any other
    /// error is reported and ends this pass.
    pub fn do_wait(&mut self, table: &mut JobTable) {
        loop {
            match self.waiter.wait_any(self.flags()) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => {
                    if let Some((pid, raw)) = RawStatus::from_wait(status) {
                        tracing::debug!(pid = %pid, status = ?raw, "reaped");
                        table.apply(pid, raw);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(Errno::EINVAL) if self.report_continued => {
                    tracing::debug!("WCONTINUED unsupported, retrying without it");
                    self.report_continued = false;
                }
                Err(e) => {
                    report("wait", &ExecError::Wait(e));
                    break;
                }
            }
        }
    }
}
