//! Builtin system for kumish.
//!
//! A builtin runs inside the shell process when it is the only stage of a
//! foreground pipeline, and in a forked child otherwise. Either way it gets
//! the same [`BuiltinContext`] and returns an [`ExecResult`](crate::result::ExecResult).
//!
//! # Architecture
//!
//! ```text
//! BuiltinRegistry
//! ├── Job control (jobs, fg, bg, disown, kill, wait)
//! └── Session (exit, cd, pwd, echo, true, false, :)
//! ```

mod args;
mod builtin;
mod context;
mod jobspec;
mod registry;
mod traits;

pub use args::{ArgError, BuiltinArgs};
pub use builtin::register_builtins;
pub use context::BuiltinContext;
pub use jobspec::{jobspec_or_current, parse_jobspec};
pub use registry::BuiltinRegistry;
pub use traits::{Builtin, BuiltinSchema};
