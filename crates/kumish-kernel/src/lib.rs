//! kumish-kernel: the execution and job-control core of kumish.
//!
//! This crate provides:
//!
//! - **Lexer / Parser / AST**: and-or lists of pipelines, with redirects,
//!   negation and trailing `&`, tokenized with logos
//! - **Exec**: forks pipelines into process groups and wires their pipes
//! - **Scheduler**: the job table, the `waitpid` reconciler and the
//!   foreground/background controller
//! - **Signal**: async-signal-safe intake of SIGCHLD, SIGHUP and SIGINT
//! - **Tools**: the builtin trait, registry and the job-control builtins
//! - **Kernel**: the facade the REPL and script runner drive

pub mod ast;
pub mod config;
pub mod error;
pub mod exec;
pub mod expand;
pub mod kernel;
pub mod lexer;
pub mod parser;
pub mod paths;
pub mod result;
pub mod scheduler;
pub mod signal;
pub mod state;
pub mod terminal;
pub mod tools;

pub use config::KernelConfig;
pub use error::{ExecError, JobSpecError, ParseError, RedirectError, TerminalError};
pub use kernel::Kernel;
pub use result::ExecResult;
pub use scheduler::{Job, JobControl, JobId, JobStatus, JobTable};
pub use tools::{Builtin, BuiltinContext, BuiltinRegistry, BuiltinSchema};
