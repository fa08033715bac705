//! Redirection actions, applied in a forked child before exec.

use std::os::fd::RawFd;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};

use crate::ast::{Redirect, RedirectOp};
use crate::error::RedirectError;

/// Where a redirected descriptor comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectSource {
    Path { path: String, flags: OFlag },
    Dup(RawFd),
    Close,
}

/// One redirection with its target already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectAction {
    pub fd: RawFd,
    pub source: RedirectSource,
}

impl RedirectAction {
    /// Build from the parsed form and the expanded target word.
    pub fn from_ast(redirect: &Redirect, target: String) -> Result<Self, RedirectError> {
        let fd = redirect.target_fd();
        let source = match redirect.op {
            RedirectOp::DupInput | RedirectOp::DupOutput => {
                if target == "-" {
                    RedirectSource::Close
                } else if !target.is_empty() && target.bytes().all(|b| b.is_ascii_digit()) {
                    let from = target
                        .parse()
                        .map_err(|_| RedirectError::BadDescriptor(target.clone()))?;
                    RedirectSource::Dup(from)
                } else {
                    return Err(RedirectError::BadDescriptor(target));
                }
            }
            op => RedirectSource::Path {
                path: target,
                flags: open_flags(op),
            },
        };
        Ok(Self { fd, source })
    }

    /// Make the change on this process's descriptor table.
    pub fn apply(&self) -> Result<(), RedirectError> {
        match &self.source {
            RedirectSource::Path { path, flags } => {
                let opened = open(path.as_str(), *flags, Mode::from_bits_truncate(0o666))
                    .map_err(|source| RedirectError::Open {
                        path: path.clone(),
                        source,
                    })?;
                if opened != self.fd {
                    let dup = dup2(opened, self.fd);
                    let _ = close(opened);
                    dup.map_err(|source| RedirectError::Dup { fd: self.fd, source })?;
                }
            }
            RedirectSource::Dup(from) => {
                if *from != self.fd {
                    dup2(*from, self.fd).map_err(|source| RedirectError::Dup { fd: *from, source })?;
                }
            }
            RedirectSource::Close => {
                let _ = close(self.fd);
            }
        }
        Ok(())
    }
}

fn open_flags(op: RedirectOp) -> OFlag {
    match op {
        RedirectOp::Read => OFlag::O_RDONLY,
        RedirectOp::Write | RedirectOp::Clobber => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        RedirectOp::Append => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        RedirectOp::ReadWrite => OFlag::O_RDWR | OFlag::O_CREAT,
        // Dup forms never reach here.
        RedirectOp::DupInput | RedirectOp::DupOutput => OFlag::O_RDONLY,
    }
}

/// Apply redirections left to right, stopping at the first failure.
pub fn open_redirections(actions: &[RedirectAction]) -> Result<(), RedirectError> {
    actions.iter().try_for_each(RedirectAction::apply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Word;
    use rstest::rstest;
    use std::fs;
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::os::fd::FromRawFd;

    fn redirect(fd: Option<RawFd>, op: RedirectOp, target: &str) -> Redirect {
        Redirect {
            fd,
            op,
            target: Word(target.to_string()),
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("kumish-redirect-{}-{name}", std::process::id()))
    }

    #[rstest]
    #[case(RedirectOp::Read, 0)]
    #[case(RedirectOp::Write, 1)]
    #[case(RedirectOp::Append, 1)]
    #[case(RedirectOp::ReadWrite, 0)]
    #[case(RedirectOp::DupOutput, 1)]
    fn default_descriptors(#[case] op: RedirectOp, #[case] fd: RawFd) {
        let target = if matches!(op, RedirectOp::DupOutput) { "2" } else { "f" };
        let action = RedirectAction::from_ast(&redirect(None, op, target), target.to_string())
            .expect("valid redirect");
        assert_eq!(action.fd, fd);
    }

    #[rstest]
    #[case("-", RedirectSource::Close)]
    #[case("1", RedirectSource::Dup(1))]
    fn dup_targets(#[case] target: &str, #[case] expected: RedirectSource) {
        let action = RedirectAction::from_ast(
            &redirect(Some(2), RedirectOp::DupOutput, target),
            target.to_string(),
        )
        .expect("valid dup");
        assert_eq!(action.source, expected);
    }

    #[test]
    fn dup_to_a_word_is_rejected() {
        let err = RedirectAction::from_ast(
            &redirect(Some(2), RedirectOp::DupOutput, "out"),
            "out".to_string(),
        )
        .unwrap_err();
        assert_eq!(err, RedirectError::BadDescriptor("out".to_string()));
    }

    #[test]
    fn write_then_append_lands_on_the_named_fd() {
        let path = temp_path("append");
        let _ = fs::remove_file(&path);
        let target = path.to_string_lossy().to_string();

        for op in [RedirectOp::Write, RedirectOp::Append] {
            let action = RedirectAction::from_ast(&redirect(Some(217), op, &target), target.clone())
                .expect("valid redirect");
            open_redirections(&[action]).expect("redirect applies");
            // SAFETY: fd 217 was just opened by dup2 and is owned here.
            let mut file = unsafe { fs::File::from_raw_fd(217) };
            file.write_all(b"line\n").expect("write");
        }

        assert_eq!(fs::read_to_string(&path).expect("read back"), "line\nline\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn read_and_dup_share_the_file() {
        let path = temp_path("read");
        fs::write(&path, "hello").expect("seed file");
        let target = path.to_string_lossy().to_string();

        let actions = [
            RedirectAction::from_ast(&redirect(Some(218), RedirectOp::Read, &target), target.clone())
                .expect("read"),
            RedirectAction::from_ast(&redirect(Some(219), RedirectOp::DupInput, "218"), "218".to_string())
                .expect("dup"),
            RedirectAction::from_ast(&redirect(Some(218), RedirectOp::DupInput, "-"), "-".to_string())
                .expect("close"),
        ];
        open_redirections(&actions).expect("redirects apply");

        // SAFETY: fd 219 is the dup made above.
        let mut file = unsafe { fs::File::from_raw_fd(219) };
        file.seek(SeekFrom::Start(0)).expect("seek");
        let mut text = String::new();
        file.read_to_string(&mut text).expect("read");
        assert_eq!(text, "hello");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_input_file_reports_path() {
        let target = temp_path("missing").to_string_lossy().to_string();
        let action = RedirectAction::from_ast(&redirect(Some(216), RedirectOp::Read, &target), target.clone())
            .expect("valid redirect");
        match open_redirections(&[action]) {
            Err(RedirectError::Open { path, .. }) => assert_eq!(path, target),
            other => panic!("expected open failure, got {other:?}"),
        }
    }
}
