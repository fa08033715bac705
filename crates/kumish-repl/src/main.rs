//! kumish CLI entry point.
//!
//! Usage:
//!   kumish                 # Interactive REPL (or read stdin if it is not a tty)
//!   kumish -c <command>    # Execute command and exit
//!   kumish script.sh       # Run a script
//!   kumish -i ...          # Force interactive behavior
//!   kumish -l ...          # Login shell (also when argv[0] starts with '-')

use std::env;
use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use kumish_kernel::KernelConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // Diagnostics only; RUST_LOG overrides the default level.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    let mut login = args.first().is_some_and(|arg0| arg0.starts_with('-'));
    let mut forced_interactive = false;
    let mut rest = args.get(1..).unwrap_or_default();
    while let Some(flag) = rest.first().map(String::as_str) {
        match flag {
            "-i" => forced_interactive = true,
            "-l" => login = true,
            _ => break,
        }
        rest = &rest[1..];
    }
    let shell = ShellMode {
        interactive: forced_interactive,
        login,
    };

    match rest.first().map(|s| s.as_str()) {
        None if forced_interactive || std::io::stdin().is_terminal() => {
            let status = kumish_repl::run(login)?;
            Ok(exit_code(status))
        }

        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read commands from stdin")?;
            let status = kumish_repl::run_source(KernelConfig::non_interactive().with_login(login), &source);
            Ok(exit_code(status))
        }

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("kumish {} ({})", env!("CARGO_PKG_VERSION"), env!("KUMISH_GIT_HASH"));
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let cmd = rest.get(1).context("-c requires a command argument")?;
            let status = kumish_repl::run_source(shell.config(), cmd);
            Ok(exit_code(status))
        }

        Some(path) if !path.starts_with('-') => run_script(path, shell),

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'kumish --help' for usage.");
            Ok(ExitCode::from(2))
        }
    }
}

fn print_help() {
    println!(
        r#"kumish v{}

Usage:
  kumish                       Interactive shell
  kumish -c <command>          Execute command and exit
  kumish <script>              Run a script file

Options:
  -c <command>                 Execute command string and exit
  -i                           Behave as an interactive shell
  -l                           Behave as a login shell
  -h, --help                   Show this help
  -V, --version                Show version

Configuration is read from $XDG_CONFIG_HOME/kumish/config.toml.
Set RUST_LOG=debug for diagnostics on stderr.
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Run a script file.
fn run_script(path: &str, shell: ShellMode) -> Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {path}"))?;
    let status = kumish_repl::run_source(shell.config().with_name(path), &source);
    Ok(exit_code(status))
}

/// Leading `-i`/`-l` flags.
#[derive(Debug, Clone, Copy)]
struct ShellMode {
    interactive: bool,
    login: bool,
}

impl ShellMode {
    /// `-i` without a terminal still runs interactively, just without job control.
    fn config(self) -> KernelConfig {
        let config = if self.interactive {
            KernelConfig::interactive().with_job_control(std::io::stdin().is_terminal())
        } else {
            KernelConfig::non_interactive()
        };
        config.with_login(self.login)
    }
}

fn exit_code(status: i32) -> ExitCode {
    ExitCode::from((status & 0xff) as u8)
}
