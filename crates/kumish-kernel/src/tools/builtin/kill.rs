//! kill — Send signals to processes or jobs.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::error::ExecError;
use crate::result::{ExecResult, EXIT_FAILURE, SIGNAL_OFFSET};
use crate::scheduler::{send_signal, JobStatus};
use crate::signal::{all_signals, parse_signal, signal_name};
use crate::tools::jobspec::parse_jobspec;
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::usage;

/// Signals per line in `kill -l`.
const LIST_COLUMNS: usize = 4;

/// Kill builtin.
///
/// ```text
/// kill [-s SIG | -n NUM | -SIG] pid|jobspec ...
/// kill -l [status|signal ...]
/// ```
pub struct Kill;

impl Builtin for Kill {
    fn name(&self) -> &str {
        "kill"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("kill", "Send a signal to processes or jobs (default TERM)")
            .usage("[-s sigspec | -n signum | -sigspec] pid | jobspec ... or kill -l [sigspec]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let mut signal = Some(Signal::SIGTERM);
        let mut rest = args;

        match args.first().map(String::as_str) {
            None => return usage(&schema),
            Some("-l") | Some("-L") => return list(&args[1..]),
            Some(flag @ ("-s" | "-n")) => {
                let Some(spec) = args.get(1) else {
                    return ExecResult::failure(
                        2,
                        format!("kill: {flag}: option requires an argument\n{}\n", schema.usage_line()),
                    );
                };
                match signal_operand(spec) {
                    Some(parsed) => signal = parsed,
                    None => return invalid_signal(spec),
                }
                rest = &args[2..];
            }
            Some("--") => rest = &args[1..],
            Some(arg) if arg.len() > 1 && arg.starts_with('-') => {
                match signal_operand(&arg[1..]) {
                    Some(parsed) => signal = parsed,
                    None => return invalid_signal(&arg[1..]),
                }
                rest = &args[1..];
            }
            Some(_) => {}
        }
        if rest.first().map(String::as_str) == Some("--") {
            rest = &rest[1..];
        }
        if rest.is_empty() {
            return usage(&schema);
        }

        ctx.jobs.reconcile();

        let mut result = ExecResult::default();
        for target in rest {
            if let Err(message) = signal_target(ctx, target, signal) {
                result.err.push_str(&format!("kill: {target}: {message}\n"));
                result.code = EXIT_FAILURE;
            }
        }
        result
    }
}

/// `0` is the null signal; anything else must name a real one.
fn signal_operand(spec: &str) -> Option<Option<Signal>> {
    if spec == "0" {
        return Some(None);
    }
    parse_signal(spec).map(Some)
}

fn invalid_signal(spec: &str) -> ExecResult {
    ExecResult::failure(EXIT_FAILURE, format!("kill: {spec}: invalid signal specification\n"))
}

fn signal_target(ctx: &mut BuiltinContext<'_>, target: &str, signal: Option<Signal>) -> Result<(), String> {
    if target.starts_with('%') {
        let id = parse_jobspec(ctx.jobs.table(), target, true).map_err(|e| e.to_string())?;
        let Some(job) = ctx.jobs.table().get(id) else {
            return Err("no such job".to_string());
        };
        send_signal(job, signal).map_err(|e| ExecError::Signal(e).to_string())?;
        // A stopped job cannot act on these until it runs again.
        if job.status() == JobStatus::Stopped
            && matches!(signal, Some(Signal::SIGTERM) | Some(Signal::SIGHUP))
        {
            let _ = send_signal(job, Signal::SIGCONT);
        }
        return Ok(());
    }

    let pid: i32 = target
        .parse()
        .map_err(|_| "arguments must be process or job IDs".to_string())?;
    kill(Pid::from_raw(pid), signal).map_err(|e| ExecError::Signal(e).to_string())
}

/// `kill -l`: the whole table, or one conversion per operand.
fn list(operands: &[String]) -> ExecResult {
    if operands.is_empty() {
        return ExecResult::success(signal_table());
    }

    let mut result = ExecResult::default();
    for operand in operands {
        match convert(operand) {
            Some(line) => {
                result.out.push_str(&line);
                result.out.push('\n');
            }
            None => {
                result.err.push_str(&format!("kill: {operand}: invalid signal specification\n"));
                result.code = EXIT_FAILURE;
            }
        }
    }
    result
}

/// Number (or exit status above 128) to name, name to number.
fn convert(operand: &str) -> Option<String> {
    if let Ok(mut number) = operand.parse::<i32>() {
        if number > SIGNAL_OFFSET {
            number -= SIGNAL_OFFSET;
        }
        let signal = Signal::try_from(number).ok()?;
        return Some(signal_name(signal).to_string());
    }
    parse_signal(operand).map(|signal| (signal as i32).to_string())
}

fn signal_table() -> String {
    let entries: Vec<String> = all_signals()
        .into_iter()
        .map(|signal| format!("{:2}) {:<10}", signal as i32, signal_name(signal)))
        .collect();

    let mut text = String::new();
    for row in entries.chunks(LIST_COLUMNS) {
        text.push_str(row.concat().trim_end());
        text.push('\n');
    }
    text
}
