//! Filesystem path helpers: home directory and command search.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Get the user's home directory.
///
/// Returns `$HOME` or falls back to `/` if not set.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// True if `path` is a regular file with any execute bit set.
pub fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Resolve a command name in PATH.
///
/// Searches each directory in `path_var` (colon-separated) for an executable
/// named `name`. An empty entry means the current directory. Returns the
/// full path if found.
pub fn resolve_in_path(name: &str, path_var: &str) -> Option<PathBuf> {
    path_var
        .split(':')
        .map(|dir| {
            if dir.is_empty() {
                Path::new(".").join(name)
            } else {
                Path::new(dir).join(name)
            }
        })
        .find(|candidate| is_executable(candidate))
}

/// Search path used when `$PATH` is unset.
pub const DEFAULT_PATH: &str = "/usr/bin:/bin";

/// Resolve the program to exec for `name`.
///
/// Names containing a slash are used as-is; anything else is looked up in
/// `search` if given, else in `$PATH`.
pub fn command_path(name: &str, search: Option<&str>) -> Option<PathBuf> {
    if name.contains('/') {
        return Some(PathBuf::from(name));
    }
    match search {
        Some(path_var) => resolve_in_path(name, path_var),
        None => {
            let path_var = std::env::var("PATH").unwrap_or_else(|_| DEFAULT_PATH.to_string());
            resolve_in_path(name, &path_var)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sh_on_a_standard_path() {
        let found = resolve_in_path("sh", "/nonexistent:/bin:/usr/bin").expect("sh should exist");
        assert!(found.ends_with("sh"));
        assert!(is_executable(&found));
    }

    #[test]
    fn missing_command() {
        assert_eq!(resolve_in_path("kumish-no-such-command", "/bin:/usr/bin"), None);
    }

    #[test]
    fn directories_are_not_executables() {
        assert_eq!(resolve_in_path("bin", "/usr:/"), None);
    }

    #[test]
    fn slash_names_bypass_search() {
        assert_eq!(command_path("./script", None), Some(PathBuf::from("./script")));
    }

    #[test]
    fn explicit_search_path_wins() {
        assert_eq!(command_path("sh", Some("/nonexistent")), None);
        assert!(command_path("sh", Some("/bin:/usr/bin")).is_some());
    }
}
