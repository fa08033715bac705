//! The job table.
//!
//! Numbered jobs live in `slots`, job N at index N-1. Freed slots become
//! `None` and are reused lowest-first; the vector never shrinks. A job that
//! is still launching lives in the separate `active` field until it is
//! either promoted to a number or dropped.

use nix::unistd::Pid;

use super::job::{Job, JobId, JobStatus, RawStatus};
use crate::error::JobSpecError;

/// Either the launching job or a numbered one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSlot {
    Active,
    Numbered(JobId),
}

#[derive(Debug, Default)]
pub struct JobTable {
    active: Option<Job>,
    slots: Vec<Option<Job>>,
    current: Option<JobId>,
    previous: Option<JobId>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Active job
    // ─────────────────────────────────────────────────────────────────────

    /// Install the job being launched. Any previous active job is returned.
    pub fn set_active(&mut self, job: Job) -> Option<Job> {
        self.active.replace(job)
    }

    pub fn active(&self) -> Option<&Job> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Job> {
        self.active.as_mut()
    }

    pub fn take_active(&mut self) -> Option<Job> {
        self.active.take()
    }

    /// Move the active job into a numbered slot and make it current.
    pub fn promote_active(&mut self) -> Option<JobId> {
        let job = self.active.take()?;
        Some(self.add(job))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Numbered jobs
    // ─────────────────────────────────────────────────────────────────────

    /// Store a job in the lowest free slot and make it the current job.
    pub fn add(&mut self, job: Job) -> JobId {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(job);
                index
            }
            None => {
                self.slots.push(Some(job));
                self.slots.len() - 1
            }
        };
        let id = JobId(index + 1);
        self.set_current(id);
        tracing::debug!(job = %id, "job added");
        id
    }

    /// Free a slot. Current/previous pointers move off the removed job.
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let job = self.slots.get_mut(id.0.checked_sub(1)?)?.take()?;

        if self.current == Some(id) {
            self.current = self.previous.take();
        } else if self.previous == Some(id) {
            self.previous = None;
        }
        if self.current.is_none() {
            self.current = self.pick_next(None);
        }
        if self.previous.is_none() {
            self.previous = self.pick_next(self.current);
        }

        tracing::debug!(job = %id, "job removed");
        Some(job)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.slots.get(id.0.checked_sub(1)?)?.as_ref()
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.slots.get_mut(id.0.checked_sub(1)?)?.as_mut()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.get(id).is_some()
    }

    pub fn job(&self, slot: JobSlot) -> Option<&Job> {
        match slot {
            JobSlot::Active => self.active(),
            JobSlot::Numbered(id) => self.get(id),
        }
    }

    pub fn job_mut(&mut self, slot: JobSlot) -> Option<&mut Job> {
        match slot {
            JobSlot::Active => self.active_mut(),
            JobSlot::Numbered(id) => self.get_mut(id),
        }
    }

    /// Numbered jobs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (JobId, &Job)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|job| (JobId(i + 1), job)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (JobId, &mut Job)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|job| (JobId(i + 1), job)))
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every job, the active one included. Used when a subshell starts.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Current and previous job
    // ─────────────────────────────────────────────────────────────────────

    pub fn current(&self) -> Option<JobId> {
        self.current
    }

    pub fn previous(&self) -> Option<JobId> {
        self.previous
    }

    /// Make `id` the current job; the old current job becomes previous.
    pub fn set_current(&mut self, id: JobId) {
        if self.current == Some(id) {
            return;
        }
        if self.current.is_some() {
            self.previous = self.current;
        } else if self.previous == Some(id) {
            self.previous = None;
        }
        self.current = Some(id);
        if self.previous.is_none() {
            self.previous = self.pick_next(Some(id));
        }
    }

    /// Marker shown in listings: `+` current, `-` previous, else space.
    pub fn marker(&self, id: JobId) -> char {
        if self.current == Some(id) {
            '+'
        } else if self.previous == Some(id) {
            '-'
        } else {
            ' '
        }
    }

    /// Candidate for current/previous: a stopped job if any, else the
    /// highest-numbered job, never `exclude`.
    fn pick_next(&self, exclude: Option<JobId>) -> Option<JobId> {
        let candidates = || self.iter().filter(|(id, _)| Some(*id) != exclude);
        candidates()
            .filter(|(_, job)| job.status() == JobStatus::Stopped)
            .map(|(id, _)| id)
            .last()
            .or_else(|| candidates().map(|(id, _)| id).last())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────

    /// Numbered job owning `pid`.
    pub fn find_by_pid(&self, pid: Pid) -> Option<JobId> {
        self.iter()
            .find(|(_, job)| job.contains_pid(pid))
            .map(|(id, _)| id)
    }

    /// The unique job whose name starts with `prefix`.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<JobId, JobSpecError> {
        self.find_unique(|name| name.starts_with(prefix))
    }

    /// The unique job whose name contains `text`.
    pub fn find_containing(&self, text: &str) -> Result<JobId, JobSpecError> {
        self.find_unique(|name| name.contains(text))
    }

    fn find_unique(&self, matches: impl Fn(&str) -> bool) -> Result<JobId, JobSpecError> {
        let mut found = None;
        for (id, job) in self.iter() {
            if matches(&job.name()) {
                if found.is_some() {
                    return Err(JobSpecError::Ambiguous);
                }
                found = Some(id);
            }
        }
        found.ok_or(JobSpecError::NotFound)
    }

    /// Jobs whose status is Stopped.
    pub fn has_stopped(&self) -> bool {
        self.iter().any(|(_, job)| job.status() == JobStatus::Stopped)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────

    /// Record a wait report for `pid` in whichever job owns it.
    ///
    /// Returns false when no job owns the pid (it may have been disowned).
    pub fn apply(&mut self, pid: Pid, raw: RawStatus) -> bool {
        let owner = self
            .active
            .iter_mut()
            .chain(self.slots.iter_mut().flatten())
            .find(|job| job.contains_pid(pid));

        let Some(job) = owner else {
            tracing::debug!(pid = %pid, "status report for unknown process");
            return false;
        };
        if let Some(process) = job.process_mut(pid) {
            process.set_raw(raw);
        }
        if job.refresh_status() {
            tracing::debug!(pid = %pid, status = %job.status(), "job status changed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::Process;
    use nix::sys::signal::Signal;

    fn job(name: &str, pid: i32) -> Job {
        Job::with_processes(
            vec![Process::forked(Pid::from_raw(pid), name)],
            Some(Pid::from_raw(pid)),
        )
    }

    #[test]
    fn numbers_start_at_one_and_reuse_lowest_free() {
        let mut table = JobTable::new();
        let a = table.add(job("a", 10));
        let b = table.add(job("b", 20));
        let c = table.add(job("c", 30));
        assert_eq!((a, b, c), (JobId(1), JobId(2), JobId(3)));

        table.remove(b);
        table.remove(a);
        assert_eq!(table.add(job("d", 40)), JobId(1));
        assert_eq!(table.add(job("e", 50)), JobId(2));
        assert_eq!(table.add(job("f", 60)), JobId(4));
    }

    #[test]
    fn numbers_stay_stable_until_removed() {
        let mut table = JobTable::new();
        let a = table.add(job("a", 10));
        let b = table.add(job("b", 20));
        table.remove(a);
        assert_eq!(table.get(b).map(Job::name), Some("b".to_string()));
        assert!(!table.contains(a));
        assert_eq!(table.ids(), vec![b]);
    }

    #[test]
    fn newest_job_is_current_and_previous_follows() {
        let mut table = JobTable::new();
        let a = table.add(job("a", 10));
        assert_eq!(table.current(), Some(a));
        assert_eq!(table.previous(), None);

        let b = table.add(job("b", 20));
        assert_eq!(table.current(), Some(b));
        assert_eq!(table.previous(), Some(a));
        assert_eq!(table.marker(b), '+');
        assert_eq!(table.marker(a), '-');

        table.remove(b);
        assert_eq!(table.current(), Some(a));
        assert_eq!(table.previous(), None);
    }

    #[test]
    fn previous_prefers_stopped_jobs() {
        let mut table = JobTable::new();
        let a = table.add(job("a", 10));
        let b = table.add(job("b", 20));
        let c = table.add(job("c", 30));
        table.apply(Pid::from_raw(10), RawStatus::Stopped(Signal::SIGTSTP));

        // current c, previous b; removing b picks stopped a over nothing
        table.remove(b);
        assert_eq!(table.current(), Some(c));
        assert_eq!(table.previous(), Some(a));
    }

    #[test]
    fn apply_updates_active_and_numbered_jobs() {
        let mut table = JobTable::new();
        let id = table.add(job("bg", 10));
        table.set_active(job("fg", 20));

        assert!(table.apply(Pid::from_raw(20), RawStatus::Exited(0)));
        assert_eq!(table.active().map(Job::status), Some(JobStatus::Done));
        assert!(table.active().is_some_and(|j| j.changed));

        assert!(table.apply(Pid::from_raw(10), RawStatus::Stopped(Signal::SIGTTIN)));
        assert_eq!(table.get(id).map(Job::status), Some(JobStatus::Stopped));

        assert!(!table.apply(Pid::from_raw(99), RawStatus::Exited(0)));
    }

    #[test]
    fn promote_active_assigns_a_number() {
        let mut table = JobTable::new();
        table.set_active(job("sleep 5", 10));
        let id = table.promote_active().expect("active job");
        assert_eq!(id, JobId(1));
        assert!(table.active().is_none());
        assert_eq!(table.current(), Some(id));
    }

    #[test]
    fn name_lookup() {
        let mut table = JobTable::new();
        table.add(job("make", 10));
        table.add(job("makefile", 20));
        let vim = table.add(job("vim notes", 30));

        assert_eq!(table.find_by_prefix("make"), Err(JobSpecError::Ambiguous));
        assert_eq!(table.find_by_prefix("makef"), Ok(JobId(2)));
        assert_eq!(table.find_by_prefix("bogus123"), Err(JobSpecError::NotFound));
        assert_eq!(table.find_containing("notes"), Ok(vim));
        assert_eq!(table.find_by_pid(Pid::from_raw(30)), Some(vim));
    }

    #[test]
    fn zero_is_never_a_job() {
        let mut table = JobTable::new();
        table.add(job("a", 10));
        assert!(table.get(JobId(0)).is_none());
        assert!(table.remove(JobId(0)).is_none());
    }
}
