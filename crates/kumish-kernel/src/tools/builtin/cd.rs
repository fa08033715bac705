//! cd — Change working directory.

use std::path::PathBuf;

use crate::paths::home_dir;
use crate::result::{ExecResult, EXIT_FAILURE};
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::usage;

/// Cd builtin: `cd [dir | -]`.
///
/// Keeps `PWD` and `OLDPWD` in the environment so children see them.
pub struct Cd;

impl Builtin for Cd {
    fn name(&self) -> &str {
        "cd"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("cd", "Change the shell working directory").usage("[dir | -]")
    }

    fn execute(&self, args: &[String], _ctx: &mut BuiltinContext<'_>) -> ExecResult {
        if args.len() > 1 {
            return usage(&self.schema());
        }

        let arg = args.first().map(String::as_str);
        let target: PathBuf = match arg {
            None => home_dir(),
            Some("-") => match std::env::var_os("OLDPWD") {
                Some(old) => PathBuf::from(old),
                None => return ExecResult::failure(EXIT_FAILURE, "cd: OLDPWD not set\n"),
            },
            Some(dir) => PathBuf::from(dir),
        };

        let previous = std::env::current_dir().ok();
        if let Err(e) = std::env::set_current_dir(&target) {
            return ExecResult::failure(EXIT_FAILURE, format!("cd: {}: {e}\n", target.display()));
        }

        if let Some(previous) = previous {
            std::env::set_var("OLDPWD", previous);
        }
        let now = std::env::current_dir().unwrap_or(target);
        std::env::set_var("PWD", &now);

        // `cd -` shows where it went.
        if arg == Some("-") {
            ExecResult::success(format!("{}\n", now.display()))
        } else {
            ExecResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_support::Harness;

    #[test]
    fn missing_directory_fails_without_moving() {
        let mut h = Harness::new();
        let before = std::env::current_dir().expect("cwd");
        let result = h.run(&Cd, &["/nonexistent/kumish/dir"]);
        assert_eq!(result.code, 1);
        assert!(result.err.starts_with("cd: /nonexistent/kumish/dir: "));
        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }

    #[test]
    fn too_many_operands() {
        let mut h = Harness::new();
        assert_eq!(h.run(&Cd, &["a", "b"]).code, 2);
    }
}
