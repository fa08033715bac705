//! kumish REPL — interactive front end for the kumish kernel.
//!
//! It handles:
//! - Reading lines with rustyline, with persistent history
//! - Reporting job status changes before each prompt
//! - Refusing the first EOF while jobs are stopped
//! - Saving history before the shell dies of SIGHUP

pub mod config;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use kumish_kernel::{Kernel, KernelConfig};

pub use config::ReplConfig;

type LineEditor = Editor<(), DefaultHistory>;

/// The interactive loop around a [`Kernel`].
pub struct Repl {
    kernel: Kernel,
    editor: Rc<RefCell<LineEditor>>,
    history_path: Option<PathBuf>,
    config: ReplConfig,
}

impl Repl {
    /// Create a REPL with an interactive, job-controlling kernel.
    pub fn new(config: ReplConfig) -> Result<Self> {
        Self::with_kernel_config(config, KernelConfig::interactive())
    }

    /// Create a REPL around a kernel built from `kernel_config`; the REPL
    /// config decides `hup_on_exit`.
    pub fn with_kernel_config(config: ReplConfig, kernel_config: KernelConfig) -> Result<Self> {
        let kernel = Kernel::new(kernel_config.with_hup_on_exit(config.hup_on_exit));

        let editor_config = Config::builder()
            .max_history_size(config.history_size)
            .context("Invalid history size")?
            .auto_add_history(false)
            .build();
        let mut editor: LineEditor =
            Editor::with_config(editor_config).context("Failed to create editor")?;

        let history_path = config.history_path();
        if let Some(ref path) = history_path {
            if let Err(e) = editor.load_history(path) {
                // Expected on first run
                let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
                if !is_not_found {
                    tracing::warn!("Failed to load history: {}", e);
                }
            }
        }

        let mut repl = Self {
            kernel,
            editor: Rc::new(RefCell::new(editor)),
            history_path,
            config,
        };
        repl.install_hangup_hook();
        Ok(repl)
    }

    /// The shell is about to die of SIGHUP: keep what was typed.
    fn install_hangup_hook(&mut self) {
        let editor = Rc::clone(&self.editor);
        let path = self.history_path.clone();
        self.kernel.set_hangup_hook(move || {
            if let Ok(mut editor) = editor.try_borrow_mut() {
                save_history(&mut editor, path.as_deref());
            }
        });
    }

    pub fn kernel(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    /// Run until `exit` or end of input. Returns the shell's exit status.
    pub fn run(&mut self) -> Result<i32> {
        let status = loop {
            self.kernel.handle_signals();
            if self.config.notify {
                for line in self.kernel.notify_changes() {
                    eprintln!("{line}");
                }
            }

            let readline = self.editor.borrow_mut().readline(&self.config.prompt);
            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(e) = self.editor.borrow_mut().add_history_entry(line.as_str()) {
                        tracing::warn!("Failed to add history entry: {}", e);
                    }
                    self.execute(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    // Same rules as `exit`: stopped jobs earn one warning.
                    self.execute("exit");
                }
                Err(e) => return Err(e).context("Failed to read input"),
            }

            if let Some(code) = self.kernel.exit_requested() {
                break code;
            }
        };

        save_history(&mut self.editor.borrow_mut(), self.history_path.as_deref());
        self.kernel.shutdown();
        Ok(status)
    }

    fn execute(&mut self, line: &str) {
        if let Err(e) = self.kernel.execute(line) {
            eprintln!("{}: {e}", self.kernel.name());
        }
    }
}

/// Save REPL history to disk.
fn save_history(editor: &mut LineEditor, history_path: Option<&Path>) {
    let Some(path) = history_path else {
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create history directory: {}", e);
        }
    }
    if let Err(e) = editor.save_history(path) {
        tracing::warn!("Failed to save history: {}", e);
    }
}

/// Run `-c` source or a script to completion and return the shell's status.
///
/// A syntax error is reported and yields status 2.
pub fn run_source(config: KernelConfig, source: &str) -> i32 {
    let mut kernel = Kernel::new(config);
    let status = match kernel.execute(source) {
        Ok(status) => kernel.exit_requested().unwrap_or(status),
        Err(e) => {
            eprintln!("{}: {e}", kernel.name());
            kernel.last_status()
        }
    };
    kernel.shutdown();
    status
}

/// Run an interactive session, loading the user's config.
pub fn run(login: bool) -> Result<i32> {
    let config = ReplConfig::load()?;
    let mut repl = Repl::with_kernel_config(config, KernelConfig::interactive().with_login(login))?;
    repl.run()
}
