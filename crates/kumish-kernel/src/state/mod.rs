//! Per-session shell state outside the job table.
//!
//! Holds what expansion and the `exit` builtin need: `$?`, `$!`, `$$`, and
//! the pending exit request. Everything here is plain in-memory data; a
//! forked child works on its own copy.

use nix::unistd::{getpid, Pid};

/// Mutable session state shared by the executor and builtins.
#[derive(Debug, Clone)]
pub struct ShellState {
    /// Shell name, `$0`.
    pub name: String,
    /// Exit status of the last pipeline, `$?`.
    pub last_status: i32,
    /// Pid of the last process of the most recent background job, `$!`.
    pub last_bg_pid: Option<Pid>,
    /// Pid of the top-level shell, `$$`. Unchanged in subshells.
    pub shell_pid: Pid,
    /// True while reading commands from a user at a terminal.
    pub interactive: bool,
    /// Login shell.
    pub login: bool,
    /// Set by `exit`; the caller stops executing once this is present.
    pub exit_request: Option<i32>,
    /// `exit` already warned once about stopped jobs.
    pub exit_warned: bool,
}

impl ShellState {
    pub fn new(name: impl Into<String>, interactive: bool) -> Self {
        Self {
            name: name.into(),
            last_status: 0,
            last_bg_pid: None,
            shell_pid: getpid(),
            interactive,
            login: false,
            exit_request: None,
            exit_warned: false,
        }
    }

    /// Value of a special parameter (`?`, `!`, `$`, `#`, `0`), if `name` is one.
    pub fn special(&self, name: char) -> Option<String> {
        Some(match name {
            '?' => self.last_status.to_string(),
            '!' => self
                .last_bg_pid
                .map(|pid| pid.to_string())
                .unwrap_or_default(),
            '$' => self.shell_pid.to_string(),
            '#' => "0".to_string(),
            '0' => self.name.clone(),
            _ => return None,
        })
    }
}
