//! Signal intake for the shell process.
//!
//! Handlers never touch shell data structures. Each one sets an atomic flag
//! and returns; the flags are drained at safe points by
//! [`JobControl::handle_signals`](crate::scheduler::JobControl::handle_signals).
//!
//! Any read-modify-write of the job table runs inside a [`SignalGuard`],
//! which blocks SIGCHLD and SIGHUP for its lifetime. Since the handlers are
//! the only other writers, that mask is the whole synchronization story.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::libc;
use nix::sys::signal::{
    raise, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};

use crate::error::report;

static SIGCHLD_RECEIVED: AtomicBool = AtomicBool::new(false);
static SIGHUP_RECEIVED: AtomicBool = AtomicBool::new(false);
static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Set once the interactive-only dispositions have been installed.
static INTERACTIVE_DISPOSITIONS: AtomicBool = AtomicBool::new(false);

/// Signals ignored by an interactive shell but delivered normally to children.
const INTERACTIVE_IGNORED: [Signal; 4] = [
    Signal::SIGTERM,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

extern "C" fn on_signal(signum: libc::c_int) {
    let flag = match signum {
        libc::SIGCHLD => &SIGCHLD_RECEIVED,
        libc::SIGHUP => &SIGHUP_RECEIVED,
        libc::SIGINT => &SIGINT_RECEIVED,
        _ => return,
    };
    flag.store(true, Ordering::SeqCst);
}

/// SIGQUIT gets a handler rather than SIG_IGN so exec restores the default.
extern "C" fn on_quit(_: libc::c_int) {}

fn set_disposition(signal: Signal, handler: SigHandler, flags: SaFlags) -> bool {
    let action = SigAction::new(handler, flags, SigSet::empty());
    // SAFETY: the handlers only store to atomics, which is async-signal-safe.
    match unsafe { sigaction(signal, &action) } {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(signal = %signal, error = %e, "failed to set signal disposition");
            report(signal.as_str(), &format!("cannot set signal handler: {e}"));
            false
        }
    }
}

/// Install the shell's handlers.
///
/// Failures are reported and otherwise ignored; the shell keeps running
/// with whatever dispositions it inherited.
pub fn install(interactive: bool) {
    set_disposition(
        Signal::SIGCHLD,
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
    );
    set_disposition(Signal::SIGHUP, SigHandler::Handler(on_signal), SaFlags::empty());
    set_disposition(Signal::SIGQUIT, SigHandler::Handler(on_quit), SaFlags::empty());

    if interactive {
        set_disposition(Signal::SIGINT, SigHandler::Handler(on_signal), SaFlags::empty());
        for signal in INTERACTIVE_IGNORED {
            set_disposition(signal, SigHandler::SigIgn, SaFlags::empty());
        }
        INTERACTIVE_DISPOSITIONS.store(true, Ordering::SeqCst);
    }
    tracing::debug!(interactive, "signal handlers installed");
}

/// Restore default dispositions and an empty mask in a freshly forked child.
///
/// Only signals the shell itself changed are reset, so dispositions the
/// shell inherited (say, SIGINT ignored by a parent) pass through to exec.
/// `ignore_interrupts` is set for background jobs run without job control.
pub fn reset_for_child(ignore_interrupts: bool) {
    let mut reset = vec![Signal::SIGCHLD, Signal::SIGHUP, Signal::SIGQUIT];
    if INTERACTIVE_DISPOSITIONS.load(Ordering::SeqCst) {
        reset.push(Signal::SIGINT);
        reset.extend(INTERACTIVE_IGNORED);
    }
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in reset {
        // SAFETY: resetting to SIG_DFL installs no code.
        let _ = unsafe { sigaction(signal, &default) };
    }

    if ignore_interrupts {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        for signal in [Signal::SIGINT, Signal::SIGQUIT] {
            // SAFETY: as above.
            let _ = unsafe { sigaction(signal, &ignore) };
        }
    }

    let _ = SigSet::empty().thread_set_mask();
}

/// Dispositions for a forked subshell that runs jobs of its own: reset as
/// for any child, then catch SIGCHLD and SIGHUP again with fresh flags.
pub fn enter_subshell(ignore_interrupts: bool) {
    reset_for_child(ignore_interrupts);
    INTERACTIVE_DISPOSITIONS.store(false, Ordering::SeqCst);
    for flag in [&SIGCHLD_RECEIVED, &SIGHUP_RECEIVED, &SIGINT_RECEIVED] {
        flag.store(false, Ordering::SeqCst);
    }
    set_disposition(
        Signal::SIGCHLD,
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
    );
    set_disposition(Signal::SIGHUP, SigHandler::Handler(on_signal), SaFlags::empty());
}

/// Restore the default disposition of one signal.
pub fn restore_default(signal: Signal) {
    set_disposition(signal, SigHandler::SigDfl, SaFlags::empty());
}

/// True if SIGCHLD arrived since the flag was last cleared.
pub fn sigchld_pending() -> bool {
    SIGCHLD_RECEIVED.load(Ordering::SeqCst)
}

pub fn clear_sigchld() {
    SIGCHLD_RECEIVED.store(false, Ordering::SeqCst);
}

/// True if SIGHUP arrived. Never cleared: handling it ends the shell.
pub fn sighup_pending() -> bool {
    SIGHUP_RECEIVED.load(Ordering::SeqCst)
}

/// True if SIGINT arrived since the flag was last cleared.
pub fn interrupted() -> bool {
    SIGINT_RECEIVED.load(Ordering::SeqCst)
}

pub fn clear_interrupt() {
    SIGINT_RECEIVED.store(false, Ordering::SeqCst);
}

/// Unblock SIGHUP and deliver it to ourselves with the default action.
///
/// The caller restores the default disposition first. If the signal somehow
/// does not terminate us, exit with the matching status anyway.
pub fn die_by_hangup() -> ! {
    let mut set = SigSet::empty();
    set.add(Signal::SIGHUP);
    let _ = set.thread_unblock();
    let _ = raise(Signal::SIGHUP);
    std::process::exit(crate::result::SIGNAL_OFFSET + Signal::SIGHUP as i32)
}

/// Scoped critical section: SIGCHLD and SIGHUP (and optionally SIGINT) are
/// blocked until the guard drops, then the previous mask comes back.
pub struct SignalGuard {
    previous: Option<SigSet>,
    interruptible: bool,
}

impl SignalGuard {
    /// Block SIGCHLD and SIGHUP.
    pub fn block() -> Self {
        Self::with_mask(false)
    }

    /// Block SIGCHLD, SIGHUP and SIGINT, for waits that SIGINT may abort.
    pub fn block_interruptible() -> Self {
        Self::with_mask(true)
    }

    fn with_mask(interruptible: bool) -> Self {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        set.add(Signal::SIGHUP);
        if interruptible {
            set.add(Signal::SIGINT);
        }
        let previous = match set.thread_swap_mask(SigmaskHow::SIG_BLOCK) {
            Ok(previous) => Some(previous),
            Err(e) => {
                tracing::warn!(error = %e, "failed to block signals");
                None
            }
        };
        Self {
            previous,
            interruptible,
        }
    }

    /// Atomically unblock the guarded signals and sleep until a handler runs.
    ///
    /// Returns with the signals blocked again, so flags can be inspected
    /// without racing the next delivery.
    pub fn suspend(&self) {
        let mut mask = self.previous.unwrap_or_else(SigSet::empty);
        mask.remove(Signal::SIGCHLD);
        mask.remove(Signal::SIGHUP);
        if self.interruptible {
            mask.remove(Signal::SIGINT);
        }
        // SAFETY: sigsuspend only reads the mask; it always returns -1/EINTR
        // once a handler has run.
        unsafe {
            libc::sigsuspend(mask.as_ref());
        }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            if let Err(e) = previous.thread_set_mask() {
                tracing::warn!(error = %e, "failed to restore signal mask");
            }
        }
    }
}

/// Signal name without the `SIG` prefix: `Signal::SIGTERM` → `"TERM"`.
pub fn signal_name(signal: Signal) -> &'static str {
    let name = signal.as_str();
    name.strip_prefix("SIG").unwrap_or(name)
}

/// Look up a signal by name or number.
///
/// Names are case-insensitive and may carry the `SIG` prefix: `TERM`,
/// `sigterm` and `15` all name SIGTERM.
pub fn parse_signal(spec: &str) -> Option<Signal> {
    if let Ok(number) = spec.parse::<i32>() {
        return Signal::try_from(number).ok();
    }
    let upper = spec.to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    Signal::iterator().find(|s| signal_name(*s) == name)
}

/// Every signal this platform knows, in number order.
pub fn all_signals() -> Vec<Signal> {
    let mut signals: Vec<Signal> = Signal::iterator().collect();
    signals.sort_by_key(|s| *s as i32);
    signals
}

/// Human-readable description, as printed when a foreground job dies.
pub fn signal_description(signal: Signal) -> &'static str {
    match signal {
        Signal::SIGHUP => "Hangup",
        Signal::SIGINT => "Interrupt",
        Signal::SIGQUIT => "Quit",
        Signal::SIGILL => "Illegal instruction",
        Signal::SIGTRAP => "Trace/breakpoint trap",
        Signal::SIGABRT => "Aborted",
        Signal::SIGBUS => "Bus error",
        Signal::SIGFPE => "Floating point exception",
        Signal::SIGKILL => "Killed",
        Signal::SIGUSR1 => "User defined signal 1",
        Signal::SIGSEGV => "Segmentation fault",
        Signal::SIGUSR2 => "User defined signal 2",
        Signal::SIGPIPE => "Broken pipe",
        Signal::SIGALRM => "Alarm clock",
        Signal::SIGTERM => "Terminated",
        Signal::SIGSTOP | Signal::SIGTSTP => "Stopped",
        Signal::SIGTTIN => "Stopped (tty input)",
        Signal::SIGTTOU => "Stopped (tty output)",
        Signal::SIGXCPU => "CPU time limit exceeded",
        Signal::SIGXFSZ => "File size limit exceeded",
        _ => signal.as_str(),
    }
}
