//! engine
//!
//! The versioning engine: every change to the working file is recorded in
//! git, merged into trunk in the background, mirrored to a remote on demand,
//! and can be rolled back to any recorded state.
//!
//! # Architecture
//!
//! [`Engine`] is the session façade. One engine lives for one CLI invocation
//! and owns everything that used to be process-global: the git runner, the
//! [`ProbeCache`], the [`CommitJoiner`] and the prompter.
//!
//! ```text
//! bootstrap ─> transaction ─> (commit job) ─> push / save
//!                    └─────────> revert
//! ```
//!
//! # Modules
//!
//! - [`bootstrap`] - Idempotent repository setup
//! - [`transaction`] - Branch / apply / commit-or-rollback protocol
//! - [`joiner`] - Background commit jobs
//! - [`sync`] - Push to the remote and autosave
//! - [`revert`] - Restore the working file to a recorded version
//!
//! # Invariants
//!
//! - Every mutating operation joins outstanding commit jobs first
//! - At most one writer holds the data lock at a time
//! - History is only ever appended to
//!
//! # Example
//!
//! ```ignore
//! use aio::engine::Engine;
//!
//! let engine = Engine::new(home, config, Box::new(prompter));
//! engine.bootstrap()?;
//! engine.transaction(|| {
//!     std::fs::write(engine.paths().data_file(), b"new state")?;
//!     Ok(())
//! })?;
//! engine.push()?;
//! engine.wait_for_commits()?;
//! ```

pub mod bootstrap;
pub mod joiner;
pub mod revert;
pub mod sync;
pub mod transaction;

pub use bootstrap::BootstrapReport;
pub use joiner::{CommitJoiner, JobResult, JobTicket};
pub use revert::RevertOutcome;
pub use sync::{PushOutcome, SaveOutcome};
pub use transaction::{TxOutcome, TxState};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::config::{Config, ConfigError};
use crate::core::naming;
use crate::core::ops::LockError;
use crate::core::paths::AppPaths;
use crate::core::types::{BranchName, CommitRecord, ContentDigest, TypeError, LOG_FIELD_SEPARATOR};
use crate::git::{GitError, GitRunner, Probe, ProbeCache, ProcessRunner};
use crate::ui::prompts::{PromptError, Prompter};

/// Errors from engine operations.
///
/// [`EngineError::is_fatal`] decides how the CLI reacts: fatal errors end the
/// process with exit code 1 and a pointer to the log folder, recoverable ones
/// are reported and end it with exit code 2.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A git invocation failed outside of a more specific context.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A repository probe could not be answered.
    #[error("failed to inspect repository state: {0}")]
    Probe(#[source] GitError),

    /// The data lock could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The caller's mutation failed; the working file was restored.
    #[error("mutation failed, changes were rolled back: {0:#}")]
    Mutation(anyhow::Error),

    /// The mutation failed and restoring the previous state failed too.
    #[error("rollback of {branch} failed after mutation error ({mutation:#}): {source}")]
    RollbackFailed {
        branch: String,
        mutation: anyhow::Error,
        #[source]
        source: Box<EngineError>,
    },

    /// A prompt could not be answered.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Repository setup failed.
    #[error("repository bootstrap failed at '{step}': {source}")]
    Bootstrap {
        step: &'static str,
        #[source]
        source: Box<EngineError>,
    },

    /// A background commit job failed.
    #[error("committing {branch} failed: {source}")]
    CommitJob {
        branch: String,
        #[source]
        source: Box<EngineError>,
    },

    /// A background commit job panicked.
    #[error("commit job {job} panicked")]
    CommitJobPanicked { job: String },

    /// Talking to the remote failed.
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: GitError,
    },

    /// A revert failed after the safety copy was written.
    #[error("revert failed ({source}); the previous data file was saved to {}", .backup.display())]
    RevertFailed {
        backup: PathBuf,
        #[source]
        source: Box<EngineError>,
    },

    /// There is no recorded version of the working file.
    #[error("the data file has no recorded history")]
    NoHistory,

    /// The history query returned something unparseable.
    #[error("unreadable history: {0}")]
    InvalidHistory(#[from] TypeError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        EngineError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn remote(operation: &'static str) -> impl FnOnce(GitError) -> Self {
        move |source| EngineError::Remote { operation, source }
    }

    /// Whether the process should stop with a fatal error report.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Probe(_)
            | EngineError::Lock(_)
            | EngineError::Mutation(_)
            | EngineError::Prompt(_)
            | EngineError::Remote { .. }
            | EngineError::NoHistory => false,
            EngineError::Git(_)
            | EngineError::Io { .. }
            | EngineError::RollbackFailed { .. }
            | EngineError::Bootstrap { .. }
            | EngineError::CommitJob { .. }
            | EngineError::CommitJobPanicked { .. }
            | EngineError::RevertFailed { .. }
            | EngineError::InvalidHistory(_)
            | EngineError::Config(_) => true,
        }
    }
}

/// Snapshot of the repository for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub home: PathBuf,
    pub data_file: PathBuf,
    /// SHA-256 of the working file, `None` if it does not exist.
    pub digest: Option<ContentDigest>,
    /// Working file size in bytes.
    pub size: Option<u64>,
    pub trunk: BranchName,
    /// Branch currently checked out, `None` before the first commit.
    pub current_branch: Option<String>,
    /// Whether the working file has unrecorded changes.
    pub dirty: bool,
    /// URL of the configured remote.
    pub remote: Option<String>,
    /// Newest recorded version of the working file.
    pub last_change: Option<CommitRecord>,
    /// Commit jobs still running.
    pub pending_jobs: usize,
    /// Mutation branches left behind by an interrupted session.
    pub leftover_branches: Vec<String>,
}

/// One session of the versioning engine.
pub struct Engine {
    git: Arc<dyn GitRunner>,
    paths: AppPaths,
    config: Config,
    trunk: BranchName,
    probes: ProbeCache,
    joiner: CommitJoiner,
    prompter: Box<dyn Prompter>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("home", &self.paths.home)
            .field("trunk", &self.trunk)
            .field("git", &self.git)
            .field("joiner", &self.joiner)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine that runs the configured git binary in `home`.
    pub fn new(home: PathBuf, config: Config, prompter: Box<dyn Prompter>) -> Self {
        let git = Arc::new(ProcessRunner::from_config(&config, &home));
        Self::with_runner(git, home, config, prompter)
    }

    /// Create an engine on top of an arbitrary runner.
    pub fn with_runner(
        git: Arc<dyn GitRunner>,
        home: PathBuf,
        config: Config,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        let paths = AppPaths::new(home, config.data_file());
        let trunk = config.trunk();
        let probes = ProbeCache::new(config.remote(), trunk.clone(), config.data_file());
        Self {
            git,
            paths,
            config,
            trunk,
            probes,
            joiner: CommitJoiner::new(),
            prompter,
        }
    }

    /// Path layout of this deployment.
    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The trunk branch.
    pub fn trunk(&self) -> &BranchName {
        &self.trunk
    }

    /// The session's probe cache.
    pub fn probes(&self) -> &ProbeCache {
        &self.probes
    }

    /// The session's commit jobs.
    pub fn joiner(&self) -> &CommitJoiner {
        &self.joiner
    }

    /// Block until every background commit job has finished.
    pub fn wait_for_commits(&self) -> Result<(), EngineError> {
        self.joiner.wait_all()
    }

    fn git(&self) -> &dyn GitRunner {
        self.git.as_ref()
    }

    /// Check out trunk, creating it when it does not exist yet.
    pub(crate) fn checkout_trunk(&self) -> Result<(), GitError> {
        let trunk = self.trunk.as_str();
        if self.probes.trunk_exists(self.git())? {
            self.git().run(&["checkout", trunk])?;
        } else {
            self.git().run(&["checkout", "-b", trunk])?;
            self.probes.record(Probe::TrunkExists, true);
        }
        Ok(())
    }

    /// Fresh (uncached) check for unrecorded changes to the working file.
    pub(crate) fn data_file_dirty(&self) -> Result<bool, GitError> {
        file_dirty(self.git(), self.paths.data_file_name())
    }

    /// Recorded versions of the working file, newest first.
    ///
    /// Empty before the first commit.
    pub fn history(&self) -> Result<Vec<CommitRecord>, EngineError> {
        if !self
            .probes
            .local_has_commits(self.git())
            .map_err(EngineError::Probe)?
        {
            return Ok(Vec::new());
        }

        let format = format!(
            "--pretty=format:%h{sep}%ad{sep}%s",
            sep = LOG_FIELD_SEPARATOR
        );
        let output = self.git().run(&[
            "log",
            &format,
            "--date=short",
            "--",
            self.paths.data_file_name(),
        ])?;
        Ok(CommitRecord::parse_log(&output.stdout)?)
    }

    /// Describe the working file and repository.
    pub fn status(&self) -> Result<StatusReport, EngineError> {
        let data_file = self.paths.data_file();
        let (digest, size) = match std::fs::read(&data_file) {
            Ok(bytes) => (Some(ContentDigest::compute(&bytes)), Some(bytes.len() as u64)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (None, None),
            Err(e) => return Err(EngineError::io("reading data file", e)),
        };

        let current_branch = self
            .git()
            .run(&["symbolic-ref", "--quiet", "--short", "HEAD"])
            .ok()
            .map(|o| o.trimmed().to_string())
            .filter(|b| !b.is_empty());

        let remote = if self
            .probes
            .remote_configured(self.git())
            .map_err(EngineError::Probe)?
        {
            self.git()
                .run(&["remote", "get-url", self.config.remote()])
                .ok()
                .map(|o| o.trimmed().to_string())
        } else {
            None
        };

        Ok(StatusReport {
            home: self.paths.home.clone(),
            data_file,
            digest,
            size,
            trunk: self.trunk.clone(),
            current_branch,
            dirty: self.data_file_dirty()?,
            remote,
            last_change: self.history()?.into_iter().next(),
            pending_jobs: self.joiner.outstanding(),
            leftover_branches: self.leftover_branches()?,
        })
    }

    /// Local mutation branches that were never merged and deleted.
    fn leftover_branches(&self) -> Result<Vec<String>, EngineError> {
        let output = self
            .git()
            .run(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|name| naming::is_mutation_branch(name))
            .map(str::to_string)
            .collect())
    }
}

/// Whether `git status` reports anything for `file`.
pub(crate) fn file_dirty(git: &dyn GitRunner, file: &str) -> Result<bool, GitError> {
    Ok(!git.run(&["status", "--porcelain", "--", file])?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(!EngineError::NoHistory.is_fatal());
        assert!(!EngineError::Mutation(anyhow::anyhow!("bad row")).is_fatal());
        assert!(!EngineError::Lock(LockError::AlreadyLocked).is_fatal());
        assert!(EngineError::CommitJobPanicked { job: "x".into() }.is_fatal());
        assert!(EngineError::Git(GitError::BinaryNotFound {
            program: "git".into()
        })
        .is_fatal());
        assert!(EngineError::Bootstrap {
            step: "init",
            source: Box::new(EngineError::NoHistory),
        }
        .is_fatal());
    }

    #[test]
    fn mutation_error_keeps_caller_message() {
        let err = EngineError::Mutation(anyhow::anyhow!("constraint violated"));
        assert!(err.to_string().contains("constraint violated"));
        match err {
            EngineError::Mutation(inner) => assert_eq!(inner.to_string(), "constraint violated"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn revert_failure_names_backup() {
        let err = EngineError::RevertFailed {
            backup: PathBuf::from("/srv/aio/data_backup_1.db"),
            source: Box::new(EngineError::NoHistory),
        };
        assert!(err.to_string().contains("/srv/aio/data_backup_1.db"));
        assert!(err.is_fatal());
    }
}
