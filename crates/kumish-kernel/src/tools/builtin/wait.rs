//! wait — Wait for jobs or processes to finish.

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::error::JobSpecError;
use crate::result::{ExecResult, EXIT_FAILURE, EXIT_NOT_FOUND, EXIT_SUCCESS, SIGNAL_OFFSET};
use crate::scheduler::{JobId, JobSlot, JobStatus};
use crate::signal;
use crate::tools::jobspec::parse_jobspec;
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::parse_options;

/// Status when SIGINT aborts the wait.
const INTERRUPTED: i32 = SIGNAL_OFFSET + Signal::SIGINT as i32;

/// Wait builtin: `wait [jobspec | pid ...]`.
///
/// With no operands every job is waited for and the status is 0. With
/// operands each is waited for in turn and the last one's status is
/// returned. An interactive shell stops waiting on a job once it is
/// stopped. SIGINT aborts the wait with 130.
pub struct Wait;

impl Builtin for Wait {
    fn name(&self) -> &str {
        "wait"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("wait", "Wait for jobs or processes to finish").usage("[jobspec | pid ...]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let args = match parse_options(&schema, args, "") {
            Ok(args) => args,
            Err(result) => return result,
        };

        ctx.jobs.reconcile();

        if args.positional.is_empty() {
            return wait_all(ctx);
        }

        let mut result = ExecResult::default();
        for operand in &args.positional {
            let id = match resolve(ctx, operand) {
                Ok(id) => id,
                Err((code, message)) => {
                    result.err.push_str(&format!("wait: {operand}: {message}\n"));
                    result.code = code;
                    continue;
                }
            };
            match wait_one(ctx, id) {
                Some(code) => result.code = code,
                None => {
                    result.code = INTERRUPTED;
                    return result;
                }
            }
        }
        result
    }
}

/// Job for an operand, or the status and message for a bad one: 127 when
/// nothing matches, 1 when the operand is malformed.
fn resolve(ctx: &BuiltinContext<'_>, operand: &str) -> Result<JobId, (i32, String)> {
    if operand.starts_with('%') {
        return parse_jobspec(ctx.jobs.table(), operand, true).map_err(|e| {
            let code = match e {
                JobSpecError::Invalid => EXIT_FAILURE,
                JobSpecError::NotFound | JobSpecError::Ambiguous => EXIT_NOT_FOUND,
            };
            (code, e.to_string())
        });
    }
    let pid: i32 = operand
        .parse()
        .map_err(|_| (EXIT_FAILURE, "invalid target".to_string()))?;
    ctx.jobs
        .table()
        .find_by_pid(Pid::from_raw(pid))
        .ok_or_else(|| (EXIT_NOT_FOUND, format!("pid {pid} is not a child of this shell")))
}

/// Wait for one job. `None` if SIGINT cut the wait short.
fn wait_one(ctx: &mut BuiltinContext<'_>, id: JobId) -> Option<i32> {
    let return_on_stop = ctx.jobs.interactive();
    if !ctx.jobs.wait_for_job(JobSlot::Numbered(id), return_on_stop, true) {
        signal::clear_interrupt();
        return None;
    }

    let Some(job) = ctx.jobs.table().get(id) else {
        return Some(EXIT_SUCCESS);
    };
    let code = job.exit_status();
    if job.status() == JobStatus::Done {
        ctx.jobs.remove_job(id);
    }
    Some(code)
}

fn wait_all(ctx: &mut BuiltinContext<'_>) -> ExecResult {
    for id in ctx.jobs.table().ids() {
        if wait_one(ctx, id).is_none() {
            return ExecResult::status(INTERRUPTED);
        }
    }
    ExecResult::status(EXIT_SUCCESS)
}
