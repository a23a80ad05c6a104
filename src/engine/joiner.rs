//! engine::joiner
//!
//! Tracks background commit jobs and lets callers wait for all of them.
//!
//! # Architecture
//!
//! A successful transaction hands its commit-and-merge work to a background
//! thread so the caller gets control back immediately. Anything that reads or
//! writes trunk afterwards (push, save, revert, the next transaction, process
//! exit) first calls [`CommitJoiner::wait_all`].
//!
//! Two mechanisms cover the two ways work is registered:
//!
//! - [`CommitJoiner::spawn`] keeps the thread's `JoinHandle`, so the job's
//!   result (or panic) is collected at the next join
//! - [`CommitJoiner::begin`] hands out a [`JobTicket`] for work running
//!   elsewhere; dropping the ticket marks it done, on success, error or panic
//!
//! # Invariants
//!
//! - When `wait_all` returns, no job registered before the call is running
//! - The outstanding count never underflows
//! - A job error is reported exactly once

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use super::EngineError;

/// Result of one background job.
pub type JobResult = Result<(), EngineError>;

#[derive(Debug, Default)]
struct Outstanding {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Outstanding {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

/// Registration of one in-flight job. Dropping it marks the job done.
#[must_use = "dropping the ticket immediately marks the job as done"]
pub struct JobTicket {
    outstanding: Arc<Outstanding>,
}

impl fmt::Debug for JobTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobTicket").finish_non_exhaustive()
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        self.outstanding.done();
    }
}

/// Owner of every background commit job of one engine.
#[derive(Default)]
pub struct CommitJoiner {
    outstanding: Arc<Outstanding>,
    handles: Mutex<Vec<(String, JoinHandle<JobResult>)>>,
}

impl fmt::Debug for CommitJoiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitJoiner")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl CommitJoiner {
    /// Create a joiner with no jobs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job and return its ticket.
    pub fn begin(&self) -> JobTicket {
        self.outstanding.add();
        JobTicket {
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Run `job` on a named background thread.
    ///
    /// The job counts as outstanding from this call until it finishes.
    pub fn spawn<F>(&self, name: impl Into<String>, job: F) -> Result<(), EngineError>
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        let name = name.into();
        let ticket = self.begin();

        let handle = thread::Builder::new()
            .name(format!("commit-{}", name))
            .spawn(move || {
                let _ticket = ticket;
                job()
            })
            .map_err(|e| EngineError::io("spawning commit job", e))?;

        tracing::debug!(job = %name, "commit job spawned");
        self.handles.lock().push((name, handle));
        Ok(())
    }

    /// Number of jobs that have not finished yet.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.count.lock()
    }

    /// Block until every registered job has finished.
    ///
    /// Returns the first job failure; later failures are logged.
    pub fn wait_all(&self) -> Result<(), EngineError> {
        let handles = std::mem::take(&mut *self.handles.lock());
        let mut first: Option<EngineError> = None;

        for (name, handle) in handles {
            let failure = match handle.join() {
                Ok(Ok(())) => {
                    tracing::debug!(job = %name, "commit job joined");
                    continue;
                }
                Ok(Err(e)) => e,
                Err(_) => EngineError::CommitJobPanicked { job: name.clone() },
            };

            if first.is_none() {
                first = Some(failure);
            } else {
                tracing::error!(job = %name, error = %failure, "additional commit job failure");
            }
        }

        self.outstanding.wait_idle();

        match first {
            Some(e) => {
                tracing::error!(error = %e, "commit job failed");
                Err(e)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn wait_all_blocks_until_jobs_finish() {
        let joiner = CommitJoiner::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        joiner
            .spawn("slow", move || {
                thread::sleep(Duration::from_millis(100));
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        joiner.wait_all().unwrap();
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(joiner.outstanding(), 0);
    }

    #[test]
    fn wait_all_with_no_jobs_returns_immediately() {
        let joiner = CommitJoiner::new();
        joiner.wait_all().unwrap();
        joiner.wait_all().unwrap();
    }

    #[test]
    fn first_error_is_returned_once() {
        let joiner = CommitJoiner::new();
        joiner
            .spawn("bad", || Err(EngineError::NoHistory))
            .unwrap();

        assert!(matches!(joiner.wait_all(), Err(EngineError::NoHistory)));
        // Already reported.
        joiner.wait_all().unwrap();
    }

    #[test]
    fn panic_is_reported() {
        let joiner = CommitJoiner::new();
        joiner.spawn("boom", || panic!("job panicked")).unwrap();

        match joiner.wait_all() {
            Err(EngineError::CommitJobPanicked { job }) => assert_eq!(job, "boom"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(joiner.outstanding(), 0);
    }

    #[test]
    fn ticket_counts_until_dropped() {
        let joiner = Arc::new(CommitJoiner::new());
        let ticket = joiner.begin();
        assert_eq!(joiner.outstanding(), 1);

        let waiter = {
            let joiner = Arc::clone(&joiner);
            thread::spawn(move || joiner.wait_all())
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        drop(ticket);
        waiter.join().unwrap().unwrap();
        assert_eq!(joiner.outstanding(), 0);
    }

    #[test]
    fn outstanding_reflects_running_jobs() {
        let joiner = CommitJoiner::new();
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        joiner
            .spawn("gated", move || {
                let _ = rx.recv();
                Ok(())
            })
            .unwrap();

        assert_eq!(joiner.outstanding(), 1);
        tx.send(()).unwrap();
        joiner.wait_all().unwrap();
        assert_eq!(joiner.outstanding(), 0);
    }
}
