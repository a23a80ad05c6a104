//! engine::sync
//!
//! Mirror trunk to the remote, and the autosave entry point used by the
//! external scheduler.
//!
//! # Push protocol
//!
//! 1. Join outstanding commit jobs (never push a half-merged trunk)
//! 2. No remote configured: nothing to do
//! 3. Remote trunk exists: count local commits it lacks, push only if > 0
//! 4. Remote trunk missing: initial push
//!
//! Pushes are retried with an exponential back-off; failures stay recoverable.

use std::thread;

use chrono::Local;
use serde::Serialize;

use super::{Engine, EngineError};
use crate::core::naming;
use crate::core::ops::DataLock;
use crate::git::{GitError, Probe};

/// What a push did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PushOutcome {
    /// No remote is linked.
    NoRemote,
    /// The remote trunk already has every local commit.
    UpToDate,
    /// Local commits were pushed to an existing remote trunk.
    Pushed { commits: u64 },
    /// The remote had no trunk; it was created.
    InitialPush,
}

impl std::fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushOutcome::NoRemote => write!(f, "no remote repository linked"),
            PushOutcome::UpToDate => write!(f, "no changes to push"),
            PushOutcome::Pushed { commits: 1 } => write!(f, "pushed 1 commit"),
            PushOutcome::Pushed { commits } => write!(f, "pushed {} commits", commits),
            PushOutcome::InitialPush => write!(f, "pushed trunk to the remote for the first time"),
        }
    }
}

/// What an autosave did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    /// Subject of the autosave commit, if stray changes were found.
    pub committed: Option<String>,
    pub push: PushOutcome,
}

impl Engine {
    /// Push trunk to the remote if it has anything new.
    pub fn push(&self) -> Result<PushOutcome, EngineError> {
        self.joiner.wait_all()?;

        if !self
            .probes
            .remote_configured(self.git())
            .map_err(EngineError::Probe)?
        {
            tracing::warn!("no remote repository linked");
            return Ok(PushOutcome::NoRemote);
        }

        let remote = self.config.remote();
        let trunk = self.trunk.as_str();

        let heads = self
            .git()
            .run(&["ls-remote", "--heads", remote, trunk])
            .map_err(EngineError::remote("ls-remote"))?;

        let outcome = if heads.is_empty() {
            self.push_with_retries()?;
            PushOutcome::InitialPush
        } else {
            let ahead = self.commits_ahead()?;
            if ahead == 0 {
                tracing::info!(remote, trunk, "no changes to push");
                return Ok(PushOutcome::UpToDate);
            }
            self.push_with_retries()?;
            PushOutcome::Pushed { commits: ahead }
        };

        self.probes.record(Probe::RemoteHasCommits, true);
        tracing::info!(remote, trunk, outcome = %outcome, "push complete");
        Ok(outcome)
    }

    /// Number of trunk commits the remote trunk does not have.
    fn commits_ahead(&self) -> Result<u64, EngineError> {
        let remote = self.config.remote();
        let trunk = self.trunk.as_str();
        let tracking = format!("refs/remotes/{}/{}", remote, trunk);

        if !self.git().succeeds(&["rev-parse", "--verify", "--quiet", &tracking])? {
            self.git()
                .run(&["fetch", remote, trunk])
                .map_err(EngineError::remote("fetch"))?;
        }

        let range = format!("{}/{}..{}", remote, trunk, trunk);
        let output = self.git().run(&["rev-list", "--count", &range])?;
        output.trimmed().parse::<u64>().map_err(|e| {
            EngineError::Git(GitError::InvalidOutput {
                args: format!("rev-list --count {}", range),
                message: format!("{:?} is not a count: {}", output.trimmed(), e),
            })
        })
    }

    fn push_with_retries(&self) -> Result<(), EngineError> {
        let remote = self.config.remote();
        let trunk = self.trunk.as_str();
        let attempts = self.config.push_retries() + 1;
        let delay = self.config.retry_delay();

        let mut attempt = 1;
        loop {
            match self.git().run(&["push", "-u", remote, trunk]) {
                Ok(_) => return Ok(()),
                Err(e) if attempt < attempts && e.is_exit_failure() => {
                    tracing::warn!(attempt, attempts, error = %e, "push failed, retrying");
                    thread::sleep(delay.saturating_mul(1 << (attempt - 1).min(10)));
                    attempt += 1;
                }
                Err(e) => return Err(EngineError::remote("push")(e)),
            }
        }
    }

    /// Commit stray changes to the working file on trunk, then push.
    pub fn save(&self) -> Result<SaveOutcome, EngineError> {
        self.joiner.wait_all()?;

        let committed = {
            let _lock = DataLock::acquire(&self.paths)?;
            self.checkout_trunk()?;

            if self.data_file_dirty()? {
                let subject = naming::autosave_subject(Local::now());
                self.git()
                    .run(&["add", "--", self.paths.data_file_name()])?;
                self.git().run(&["commit", "-m", &subject])?;
                self.probes.record(Probe::LocalHasCommits, true);
                tracing::info!(subject = %subject, "stray changes committed");
                Some(subject)
            } else {
                tracing::debug!("nothing to autosave");
                None
            }
        };

        let push = self.push()?;
        Ok(SaveOutcome { committed, push })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_display() {
        assert_eq!(PushOutcome::Pushed { commits: 1 }.to_string(), "pushed 1 commit");
        assert_eq!(PushOutcome::Pushed { commits: 3 }.to_string(), "pushed 3 commits");
        assert_eq!(PushOutcome::UpToDate.to_string(), "no changes to push");
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_string(&PushOutcome::Pushed { commits: 2 }).unwrap();
        assert_eq!(json, r#"{"result":"pushed","commits":2}"#);
    }
}
