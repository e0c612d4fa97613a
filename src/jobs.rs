use crate::error::ShellError;
use nix::unistd::Pid;

/// A background process that has been started but not yet reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub cmdline: String,
}

/// What a single non-blocking check of a background job found.
#[derive(Debug)]
pub enum Outcome {
    /// The job has terminated; its status has been consumed.
    Exited { job: Job, status: i32 },
    /// Retrieving the status failed. The job stays queued.
    Failed { pid: Pid, error: ShellError },
}

/// The queue of outstanding background jobs, oldest first.
///
/// Its length is the number of background processes believed to still be
/// running. A job leaves the queue only when a check confirms it exited.
#[derive(Debug, Default)]
pub struct JobList {
    jobs: Vec<Job>,
}

impl JobList {
    /// Creates a new, empty job list.
    pub fn new() -> Self {
        JobList { jobs: Vec::new() }
    }

    /// Adds a newly started background job.
    pub fn add_job(&mut self, pid: Pid, cmdline: String) {
        self.jobs.push(Job { pid, cmdline });
    }

    /// Number of background jobs not yet confirmed reaped.
    pub fn tally(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Checks each queued job exactly once with `check`, removing those that
    /// exited. Jobs that are still running, or whose check failed, stay queued
    /// for the next sweep.
    ///
    /// `check` returns `Ok(Some(status))` for an exited job and `Ok(None)` for
    /// one still running. The outcomes of the exited and failed checks are
    /// returned in queue order.
    pub fn sweep<F>(&mut self, mut check: F) -> Vec<Outcome>
    where
        F: FnMut(Pid) -> Result<Option<i32>, ShellError>,
    {
        let mut outcomes = Vec::new();
        let mut still_running = Vec::with_capacity(self.jobs.len());
        for job in self.jobs.drain(..) {
            match check(job.pid) {
                Ok(Some(status)) => outcomes.push(Outcome::Exited { job, status }),
                Ok(None) => still_running.push(job),
                Err(error) => {
                    outcomes.push(Outcome::Failed {
                        pid: job.pid,
                        error,
                    });
                    still_running.push(job);
                }
            }
        }
        self.jobs = still_running;
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    #[test]
    fn test_add_job() {
        let mut jobs = JobList::new();
        assert!(jobs.is_empty());
        jobs.add_job(pid(10), "sleep 5".into());
        jobs.add_job(pid(11), "sleep 6".into());
        assert_eq!(jobs.tally(), 2);
        assert!(!jobs.is_empty());
    }

    #[test]
    fn test_sweep_checks_each_job_once() {
        let mut jobs = JobList::new();
        for raw in 1..=3 {
            jobs.add_job(pid(raw), format!("job{}", raw));
        }
        let mut checked = Vec::new();
        let outcomes = jobs.sweep(|p| {
            checked.push(p);
            Ok(if p == pid(2) { Some(7) } else { None })
        });
        assert_eq!(checked, vec![pid(1), pid(2), pid(3)]);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            Outcome::Exited { job, status } => {
                assert_eq!(job.pid, pid(2));
                assert_eq!(*status, 7);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(jobs.tally(), 2);

        let mut second_pass = Vec::new();
        jobs.sweep(|p| {
            second_pass.push(p);
            Ok(None)
        });
        assert_eq!(second_pass, vec![pid(1), pid(3)]);
    }

    #[test]
    fn test_failed_check_keeps_job() {
        let mut jobs = JobList::new();
        jobs.add_job(pid(5), "sleep 1".into());
        let outcomes = jobs.sweep(|p| {
            Err(ShellError::Wait {
                pid: p,
                source: Errno::ECHILD,
            })
        });
        assert!(matches!(outcomes[0], Outcome::Failed { pid: p, .. } if p == pid(5)));
        assert_eq!(jobs.tally(), 1);
    }

    #[test]
    fn test_sweep_on_empty_list_checks_nothing() {
        let mut jobs = JobList::new();
        let mut calls = 0;
        let outcomes = jobs.sweep(|_| {
            calls += 1;
            Ok(None)
        });
        assert!(outcomes.is_empty());
        assert_eq!(calls, 0);
    }
}
