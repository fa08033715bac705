//! Job specification parsing: `%1`, `%%`, `%+`, `%-`, `%name`, `%?text`.

use crate::error::JobSpecError;
use crate::scheduler::{JobId, JobTable};

/// Resolve `spec` against the table.
///
/// Without `force_percent` a spec may omit the leading `%` (`fg 2`,
/// `fg vim`); with it, a spec lacking `%` is invalid.
pub fn parse_jobspec(table: &JobTable, spec: &str, force_percent: bool) -> Result<JobId, JobSpecError> {
    let body = match spec.strip_prefix('%') {
        Some(body) => body,
        None if force_percent => return Err(JobSpecError::Invalid),
        None => spec,
    };

    match body {
        "" | "%" | "+" => table.current().ok_or(JobSpecError::NotFound),
        "-" => table.previous().ok_or(JobSpecError::NotFound),
        _ if body.bytes().all(|b| b.is_ascii_digit()) => {
            let number: usize = body.parse().map_err(|_| JobSpecError::NotFound)?;
            let id = JobId(number);
            if number > 0 && table.contains(id) {
                Ok(id)
            } else {
                Err(JobSpecError::NotFound)
            }
        }
        _ => match body.strip_prefix('?') {
            Some(text) => table.find_containing(text),
            None => table.find_by_prefix(body),
        },
    }
}

/// Resolve an optional spec, defaulting to the current job.
pub fn jobspec_or_current(table: &JobTable, spec: Option<&str>) -> Result<JobId, JobSpecError> {
    match spec {
        Some(spec) => parse_jobspec(table, spec, false),
        None => table.current().ok_or(JobSpecError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Job, Process};
    use nix::unistd::Pid;
    use rstest::rstest;

    fn table() -> JobTable {
        let mut table = JobTable::new();
        for (pid, name) in [(100, "make all"), (101, "vim notes"), (102, "sleep 100")] {
            table.add(Job::with_processes(vec![Process::forked(Pid::from_raw(pid), name)], None));
        }
        table
    }

    #[rstest]
    #[case("%", Ok(JobId(3)))]
    #[case("%%", Ok(JobId(3)))]
    #[case("%+", Ok(JobId(3)))]
    #[case("%-", Ok(JobId(2)))]
    #[case("%1", Ok(JobId(1)))]
    #[case("2", Ok(JobId(2)))]
    #[case("%9", Err(JobSpecError::NotFound))]
    #[case("%0", Err(JobSpecError::NotFound))]
    #[case("%vim", Ok(JobId(2)))]
    #[case("vim", Ok(JobId(2)))]
    #[case("%?100", Ok(JobId(3)))]
    #[case("%?e", Err(JobSpecError::Ambiguous))]
    #[case("%emacs", Err(JobSpecError::NotFound))]
    fn resolves(#[case] spec: &str, #[case] expected: Result<JobId, JobSpecError>) {
        assert_eq!(parse_jobspec(&table(), spec, false), expected);
    }

    #[test]
    fn percent_can_be_required() {
        assert_eq!(parse_jobspec(&table(), "1", true), Err(JobSpecError::Invalid));
        assert_eq!(parse_jobspec(&table(), "%1", true), Ok(JobId(1)));
    }

    #[test]
    fn empty_table_has_no_current_job() {
        let table = JobTable::new();
        assert_eq!(parse_jobspec(&table, "%%", false), Err(JobSpecError::NotFound));
        assert_eq!(jobspec_or_current(&table, None), Err(JobSpecError::NotFound));
    }
}
