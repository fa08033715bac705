//! fg — Resume a job in the foreground and wait for it.

use crate::result::ExecResult;
use crate::scheduler::JobSlot;
use crate::tools::jobspec::jobspec_or_current;
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::{fail, parse_options, usage};

/// Fg builtin: `fg [jobspec]`.
///
/// The job's exit status becomes fg's own. A job that stops again leaves
/// fg with 128 + the stop signal.
pub struct Fg;

impl Builtin for Fg {
    fn name(&self) -> &str {
        "fg"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("fg", "Resume a job in the foreground").usage("[jobspec]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let args = match parse_options(&schema, args, "") {
            Ok(args) => args,
            Err(result) => return result,
        };
        if args.positional.len() > 1 {
            return usage(&schema);
        }
        let spec = args.positional.first().map(String::as_str);

        ctx.jobs.reconcile();
        let id = match jobspec_or_current(ctx.jobs.table(), spec) {
            Ok(id) => id,
            Err(e) => return fail("fg", spec.unwrap_or("current"), e),
        };
        let Some(job) = ctx.jobs.table().get(id) else {
            return fail("fg", spec.unwrap_or("current"), "no such job");
        };
        ExecResult::success(format!("{}\n", job.name())).emit();

        ctx.jobs.make_current(id);
        if let Err(e) = ctx.jobs.continue_job(id, true) {
            ctx.jobs.reclaim_terminal();
            return fail("fg", &format!("%{id}"), e);
        }

        let return_on_stop = ctx.jobs.job_control();
        ctx.jobs.wait_for_job(JobSlot::Numbered(id), return_on_stop, false);
        ctx.jobs.reclaim_terminal();
        ExecResult::status(ctx.jobs.finish_foreground(JobSlot::Numbered(id)))
    }
}
