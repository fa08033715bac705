//! jobs — List jobs and their status.

use crate::result::{ExecResult, EXIT_FAILURE};
use crate::scheduler::{format_job, JobId, JobStatus};
use crate::tools::jobspec::parse_jobspec;
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::parse_options;

/// Jobs builtin: `jobs [-lnprs] [jobspec ...]`.
pub struct Jobs;

impl Builtin for Jobs {
    fn name(&self) -> &str {
        "jobs"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("jobs", "List jobs: -l with pids, -p pids only, -n changed only, -r running, -s stopped")
            .usage("[-lnprs] [jobspec ...]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let args = match parse_options(&schema, args, "lnprs") {
            Ok(args) => args,
            Err(result) => return result,
        };

        ctx.jobs.reconcile();

        let mut code = 0;
        let mut err = String::new();
        let ids: Vec<JobId> = if args.positional.is_empty() {
            ctx.jobs.table().ids()
        } else {
            args.positional
                .iter()
                .filter_map(|spec| match parse_jobspec(ctx.jobs.table(), spec, false) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        err.push_str(&format!("jobs: {spec}: {e}\n"));
                        code = EXIT_FAILURE;
                        None
                    }
                })
                .collect()
        };

        let mut out = String::new();
        for id in ids {
            let Some(job) = ctx.jobs.table().get(id) else {
                continue;
            };
            if args.has('n') && !job.changed {
                continue;
            }
            if args.has('r') && job.status() != JobStatus::Running {
                continue;
            }
            if args.has('s') && job.status() != JobStatus::Stopped {
                continue;
            }

            if args.has('p') {
                if let Some(leader) = job.leader() {
                    out.push_str(&format!("{leader}\n"));
                }
                continue;
            }
            if let Some(line) = format_job(ctx.jobs.table(), id, args.has('l')) {
                out.push_str(&line);
                out.push('\n');
            }
            ctx.jobs.settle_reported(id);
        }

        ExecResult::from_output(code, out, err)
    }
}
