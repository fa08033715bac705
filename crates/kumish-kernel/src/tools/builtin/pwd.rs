//! pwd — Print working directory.

use crate::result::{ExecResult, EXIT_FAILURE};
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

/// Pwd builtin: print the shell's working directory.
pub struct Pwd;

impl Builtin for Pwd {
    fn name(&self) -> &str {
        "pwd"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("pwd", "Print current working directory")
    }

    fn execute(&self, _args: &[String], _ctx: &mut BuiltinContext<'_>) -> ExecResult {
        match std::env::current_dir() {
            Ok(dir) => ExecResult::success(format!("{}\n", dir.display())),
            Err(e) => ExecResult::failure(EXIT_FAILURE, format!("pwd: {e}\n")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_support::Harness;

    #[test]
    fn prints_an_absolute_directory() {
        let mut h = Harness::new();
        let result = h.run(&Pwd, &[]);
        assert!(result.ok());
        assert!(result.out.starts_with('/'));
        assert!(result.out.ends_with('\n'));
    }
}
