//! Builtin results and the shell's exit status conventions.

/// Success.
pub const EXIT_SUCCESS: i32 = 0;
/// General builtin failure.
pub const EXIT_FAILURE: i32 = 1;
/// Builtin usage error.
pub const EXIT_USAGE: i32 = 2;
/// A redirection could not be applied in a child.
pub const EXIT_REDIRECT: i32 = 2;
/// The command was found but could not be executed.
pub const EXIT_NOEXEC: i32 = 126;
/// The command was not found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Added to a signal number to encode "terminated/stopped by signal".
pub const SIGNAL_OFFSET: i32 = 128;

/// The result of running a builtin.
///
/// Output is captured rather than written so that the same builtin body works
/// inline in the shell and inside a forked pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Exit status. 0 means success.
    pub code: i32,
    /// Text for standard output.
    pub out: String,
    /// Text for standard error.
    pub err: String,
}

impl ExecResult {
    /// Create a successful result with output.
    pub fn success(out: impl Into<String>) -> Self {
        Self {
            code: EXIT_SUCCESS,
            out: out.into(),
            err: String::new(),
        }
    }

    /// Create a failed result with an error message.
    pub fn failure(code: i32, err: impl Into<String>) -> Self {
        Self {
            code,
            out: String::new(),
            err: err.into(),
        }
    }

    /// Create a result from both streams.
    pub fn from_output(code: i32, out: impl Into<String>, err: impl Into<String>) -> Self {
        Self {
            code,
            out: out.into(),
            err: err.into(),
        }
    }

    /// Status only, no output.
    pub fn status(code: i32) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// True if the code is 0.
    pub fn ok(&self) -> bool {
        self.code == EXIT_SUCCESS
    }

    /// Write both streams to the process's stdout/stderr and flush them.
    pub fn emit(&self) {
        use std::io::Write;

        if !self.out.is_empty() {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(self.out.as_bytes());
            let _ = out.flush();
        }
        if !self.err.is_empty() {
            let mut err = std::io::stderr().lock();
            let _ = err.write_all(self.err.as_bytes());
            let _ = err.flush();
        }
    }
}
