//! bg — Resume stopped jobs in the background.

use crate::result::{ExecResult, EXIT_FAILURE};
use crate::scheduler::{JobId, JobStatus};
use crate::tools::jobspec::{jobspec_or_current, parse_jobspec};
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::parse_options;

/// Bg builtin: `bg [jobspec ...]`.
pub struct Bg;

impl Builtin for Bg {
    fn name(&self) -> &str {
        "bg"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("bg", "Resume stopped jobs in the background").usage("[jobspec ...]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let args = match parse_options(&schema, args, "") {
            Ok(args) => args,
            Err(result) => return result,
        };

        ctx.jobs.reconcile();

        let specs: Vec<Option<&str>> = if args.positional.is_empty() {
            vec![None]
        } else {
            args.positional.iter().map(|s| Some(s.as_str())).collect()
        };

        let mut result = ExecResult::default();
        for spec in specs {
            let lookup = match spec {
                Some(spec) => parse_jobspec(ctx.jobs.table(), spec, false),
                None => jobspec_or_current(ctx.jobs.table(), None),
            };
            let id = match lookup {
                Ok(id) => id,
                Err(e) => {
                    result.err.push_str(&format!("bg: {}: {e}\n", spec.unwrap_or("current")));
                    result.code = EXIT_FAILURE;
                    continue;
                }
            };
            resume(ctx, id, &mut result);
        }
        result
    }
}

fn resume(ctx: &mut BuiltinContext<'_>, id: JobId, result: &mut ExecResult) {
    let Some(job) = ctx.jobs.table().get(id) else {
        return;
    };
    let name = job.name();
    match job.status() {
        JobStatus::Running => {
            result.err.push_str(&format!("bg: job {id} already in background\n"));
            return;
        }
        JobStatus::Done => {
            result.err.push_str(&format!("bg: %{id}: job has terminated\n"));
            result.code = EXIT_FAILURE;
            return;
        }
        JobStatus::Stopped => {}
    }

    match ctx.jobs.continue_job(id, false) {
        Ok(()) => {
            ctx.jobs.make_current(id);
            result.out.push_str(&format!("[{id}] {name} &\n"));
        }
        Err(e) => {
            result.err.push_str(&format!("bg: %{id}: {e}\n"));
            result.code = EXIT_FAILURE;
        }
    }
}
