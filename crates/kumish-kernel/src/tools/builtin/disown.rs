//! disown — Stop tracking jobs, or exempt them from SIGHUP.

use crate::result::{ExecResult, EXIT_FAILURE};
use crate::scheduler::{JobId, JobStatus};
use crate::tools::jobspec::{jobspec_or_current, parse_jobspec};
use crate::tools::{Builtin, BuiltinContext, BuiltinSchema};

use super::parse_options;

/// Disown builtin: `disown [-ahr] [jobspec ...]`.
///
/// Without `-h` the jobs leave the table and are never reported again.
/// With `-h` they stay but are skipped when the shell forwards SIGHUP.
pub struct Disown;

impl Builtin for Disown {
    fn name(&self) -> &str {
        "disown"
    }

    fn schema(&self) -> BuiltinSchema {
        BuiltinSchema::new("disown", "Remove jobs from the table: -a all, -r running only, -h keep but skip SIGHUP")
            .usage("[-ahr] [jobspec ...]")
    }

    fn execute(&self, args: &[String], ctx: &mut BuiltinContext<'_>) -> ExecResult {
        let schema = self.schema();
        let args = match parse_options(&schema, args, "ahr") {
            Ok(args) => args,
            Err(result) => return result,
        };

        ctx.jobs.reconcile();

        let mut result = ExecResult::default();
        let ids: Vec<JobId> = if !args.positional.is_empty() {
            args.positional
                .iter()
                .filter_map(|spec| match parse_jobspec(ctx.jobs.table(), spec, false) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        result.err.push_str(&format!("disown: {spec}: {e}\n"));
                        result.code = EXIT_FAILURE;
                        None
                    }
                })
                .collect()
        } else if args.has('a') || args.has('r') {
            ctx.jobs.table().ids()
        } else {
            match jobspec_or_current(ctx.jobs.table(), None) {
                Ok(id) => vec![id],
                Err(e) => return ExecResult::failure(EXIT_FAILURE, format!("disown: current: {e}\n")),
            }
        };

        for id in ids {
            let running = ctx
                .jobs
                .table()
                .get(id)
                .is_some_and(|job| job.status() == JobStatus::Running);
            if args.has('r') && !running {
                continue;
            }
            if args.has('h') {
                ctx.jobs.mark_nohup(id);
            } else {
                ctx.jobs.remove_job(id);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_support::Harness;
    use nix::sys::signal::Signal;
    use nix::sys::wait::WaitStatus;
    use nix::unistd::Pid;

    #[test]
    fn removes_the_current_job_by_default() {
        let mut h = Harness::new();
        let first = h.add_job(3_996_001, "make");
        let second = h.add_job(3_996_002, "vim");

        assert!(h.run(&Disown, &[]).ok());
        assert!(h.jobs.table().contains(first));
        assert!(!h.jobs.table().contains(second));
        assert_eq!(h.jobs.table().current(), Some(first));
    }

    #[test]
    fn nohup_keeps_the_job() {
        let mut h = Harness::new();
        let id = h.add_job(3_996_011, "sleep 30");

        assert!(h.run(&Disown, &["-h", "%1"]).ok());
        let job = h.jobs.table().get(id).expect("kept");
        assert!(job.nohup);
    }

    #[test]
    fn all_running_only() {
        let mut h = Harness::new();
        let running = h.add_job(3_996_021, "make");
        let stopped = h.add_job(3_996_022, "vim");
        h.report(WaitStatus::Stopped(Pid::from_raw(3_996_022), Signal::SIGTSTP));

        assert!(h.run(&Disown, &["-r"]).ok());
        assert!(!h.jobs.table().contains(running));
        assert!(h.jobs.table().contains(stopped));

        assert!(h.run(&Disown, &["-a"]).ok());
        assert!(h.jobs.table().is_empty());
    }

    #[test]
    fn unknown_job() {
        let mut h = Harness::new();
        let result = h.run(&Disown, &["%3"]);
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "disown: %3: no such job\n");
        assert_eq!(h.run(&Disown, &[]).err, "disown: current: no such job\n");
    }
}
