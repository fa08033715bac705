//! Error types for each failure domain of the kernel.
//!
//! Errors never unwind through the shell: the executor and builtins turn
//! them into a message on stderr plus a non-zero status.

use std::os::fd::RawFd;

use nix::errno::Errno;
use thiserror::Error;

/// Parse failure with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error at offset {offset}: unexpected {found}")]
    Unexpected { offset: usize, found: String },
    #[error("syntax error: unexpected end of input")]
    UnexpectedEof,
    #[error("syntax error at offset {offset}: {message}")]
    Lex { offset: usize, message: String },
}

/// OS-level failures while launching or waiting for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("cannot open pipe: {0}")]
    Pipe(Errno),
    #[error("cannot fork: {0}")]
    Fork(Errno),
    #[error("wait failed: {0}")]
    Wait(Errno),
    #[error("cannot send signal: {0}")]
    Signal(Errno),
}

/// Failures applying a redirection list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectError {
    #[error("{path}: {source}")]
    Open { path: String, source: Errno },
    #[error("{fd}: cannot duplicate file descriptor: {source}")]
    Dup { fd: RawFd, source: Errno },
    #[error("{0}: bad file descriptor")]
    BadDescriptor(String),
}

/// Failures moving the controlling terminal between process groups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalError {
    #[error("job has terminated")]
    JobTerminated,
    #[error("no controlling terminal: {0}")]
    NoTerminal(Errno),
    #[error("cannot set terminal process group: {0}")]
    Os(Errno),
}

impl From<Errno> for TerminalError {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::EPERM | Errno::ESRCH => TerminalError::JobTerminated,
            other => TerminalError::Os(other),
        }
    }
}

/// Job specification lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JobSpecError {
    #[error("invalid job specification")]
    Invalid,
    #[error("no such job")]
    NotFound,
    #[error("ambiguous job specification")]
    Ambiguous,
}

/// Print a shell-level diagnostic to stderr.
///
/// `context` is usually the command name or the failing operation.
pub fn report(context: &str, err: &dyn std::fmt::Display) {
    eprintln!("kumish: {context}: {err}");
}
