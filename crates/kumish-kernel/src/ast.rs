//! Abstract syntax tree for shell source: lists of pipelines of commands.

mod types;

pub use types::*;
