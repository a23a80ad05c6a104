//! engine::transaction
//!
//! Branch / apply / commit-or-rollback protocol around one mutation of the
//! working file.
//!
//! # State machine
//!
//! ```text
//! Idle -> Syncing -> BranchOpen -> Applying -> CommittingAsync -> Idle
//!                                          \-> RollingBack     -> Idle
//! ```
//!
//! - **Syncing**: fast-forward trunk from the remote once per session. An
//!   unreachable remote degrades to offline mode; a trunk that cannot be
//!   fast-forwarded aborts with the repository untouched.
//! - **BranchOpen**: check out trunk, then a fresh mutation branch.
//! - **Applying**: snapshot the working file and run the caller's mutation.
//! - **RollingBack**: restore the snapshot, return to trunk, delete the branch.
//! - **CommittingAsync**: hand commit + merge + branch deletion to a
//!   background job and return immediately.
//!
//! # Invariants
//!
//! - The data lock is held from the start of Syncing until the commit job
//!   finishes (or the rollback completes)
//! - On failure the working file is byte-identical to its state before the
//!   mutation and no mutation branch remains
//! - Outstanding commit jobs are joined before a new transaction starts

use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::{file_dirty, Engine, EngineError, JobResult};
use crate::core::naming;
use crate::core::ops::DataLock;
use crate::core::types::BranchName;
use crate::git::{GitError, GitRunner};

/// Where a transaction currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Idle,
    Syncing,
    BranchOpen,
    Applying,
    CommittingAsync,
    RollingBack,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxState::Idle => "idle",
            TxState::Syncing => "syncing",
            TxState::BranchOpen => "branch-open",
            TxState::Applying => "applying",
            TxState::CommittingAsync => "committing-async",
            TxState::RollingBack => "rolling-back",
        };
        write!(f, "{}", s)
    }
}

/// Result of a successful transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutcome {
    /// The mutation branch whose commit job is now running.
    pub branch: BranchName,
}

fn enter(state: TxState, branch: Option<&BranchName>) {
    match branch {
        Some(b) => tracing::debug!(state = %state, branch = %b, "transaction"),
        None => tracing::debug!(state = %state, "transaction"),
    }
}

/// Working file contents captured before the mutation.
struct Snapshot(Option<Vec<u8>>);

impl Snapshot {
    fn take(path: &Path) -> io::Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Ok(Self(Some(bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }

    fn restore(&self, path: &Path) -> io::Result<()> {
        match &self.0 {
            Some(bytes) => fs::write(path, bytes),
            None => match fs::remove_file(path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        }
    }
}

impl Engine {
    /// Apply `mutate` to the working file as one recorded change.
    ///
    /// On success the change is committed on a mutation branch and merged
    /// into trunk by a background job; call [`Engine::wait_for_commits`] (or
    /// any other engine operation) to wait for it. On failure the working
    /// file is restored and [`EngineError::Mutation`] carries the mutation's
    /// own error.
    pub fn transaction<F>(&self, mutate: F) -> Result<TxOutcome, EngineError>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        self.joiner.wait_all()?;
        let lock = DataLock::acquire(&self.paths)?;

        enter(TxState::Syncing, None);
        self.sync_before_mutation()?;

        enter(TxState::BranchOpen, None);
        self.checkout_trunk()?;
        let branch = naming::mutation_branch();
        self.git().run(&["checkout", "-b", branch.as_str()])?;

        enter(TxState::Applying, Some(&branch));
        let data_file = self.paths.data_file();
        let snapshot = match Snapshot::take(&data_file) {
            Ok(s) => s,
            Err(e) => {
                let err = EngineError::io("reading data file", e);
                self.discard_branch(&branch)
                    .map_err(|rb| rollback_failed(&branch, anyhow::anyhow!("{}", err), rb))?;
                return Err(err);
            }
        };

        let result = match panic::catch_unwind(AssertUnwindSafe(mutate)) {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("mutation panicked")),
        };

        if let Err(mutation) = result {
            enter(TxState::RollingBack, Some(&branch));
            tracing::warn!(branch = %branch, error = %format!("{:#}", mutation), "mutation failed, rolling back");
            if let Err(e) = snapshot.restore(&data_file) {
                return Err(rollback_failed(
                    &branch,
                    mutation,
                    EngineError::io("restoring data file", e),
                ));
            }
            if let Err(e) = self.discard_branch(&branch) {
                return Err(rollback_failed(&branch, mutation, e));
            }
            enter(TxState::Idle, Some(&branch));
            return Err(EngineError::Mutation(mutation));
        }

        enter(TxState::CommittingAsync, Some(&branch));
        let job = CommitJob {
            git: Arc::clone(&self.git),
            data_file: self.paths.data_file_name().to_string(),
            trunk: self.trunk.clone(),
            branch: branch.clone(),
            lock,
        };
        self.joiner.spawn(branch.as_str(), move || job.run())?;

        enter(TxState::Idle, Some(&branch));
        Ok(TxOutcome { branch })
    }

    /// Pull trunk before branching, if there is remote history to align with.
    fn sync_before_mutation(&self) -> Result<(), EngineError> {
        if self.probes.is_aligned() {
            return Ok(());
        }
        let has_remote_history = match self.probes.remote_has_commits(self.git()) {
            Ok(has) => has,
            Err(e) => {
                tracing::warn!(error = %e, "cannot reach remote, working offline");
                return Ok(());
            }
        };
        if has_remote_history {
            self.align_trunk().map_err(EngineError::remote("pull"))?;
        }
        Ok(())
    }

    /// Return to trunk and delete `branch`.
    fn discard_branch(&self, branch: &BranchName) -> Result<(), EngineError> {
        self.git().run(&["checkout", self.trunk.as_str()])?;
        self.git().run(&["branch", "-D", branch.as_str()])?;
        tracing::debug!(branch = %branch, "mutation branch discarded");
        Ok(())
    }
}

fn rollback_failed(branch: &BranchName, mutation: anyhow::Error, source: EngineError) -> EngineError {
    tracing::error!(branch = %branch, error = %source, "rollback failed");
    EngineError::RollbackFailed {
        branch: branch.to_string(),
        mutation,
        source: Box::new(source),
    }
}

/// Deferred commit + merge of one mutation branch.
///
/// Owns the data lock; it is released when the job ends.
struct CommitJob {
    git: Arc<dyn GitRunner>,
    data_file: String,
    trunk: BranchName,
    branch: BranchName,
    lock: DataLock,
}

impl CommitJob {
    fn run(self) -> JobResult {
        let result = self.commit_and_merge();
        drop(self.lock);
        result.map_err(|e| EngineError::CommitJob {
            branch: self.branch.to_string(),
            source: Box::new(e.into()),
        })
    }

    fn commit_and_merge(&self) -> Result<(), GitError> {
        let git = self.git.as_ref();
        let branch = self.branch.as_str();
        let trunk = self.trunk.as_str();

        if file_dirty(git, &self.data_file)? {
            git.run(&["add", "--", &self.data_file])?;
            git.run(&["commit", "-m", &naming::change_subject(&self.branch)])?;
            git.run(&["checkout", trunk])?;
            git.run(&["merge", "--no-ff", "-m", &naming::merge_subject(&self.branch), branch])?;
            tracing::info!(branch = %branch, trunk = %trunk, "change merged into trunk");
        } else {
            git.run(&["checkout", trunk])?;
            tracing::info!(branch = %branch, "mutation left the data file unchanged");
        }

        git.run(&["branch", "-D", branch])?;
        Ok(())
    }
}
