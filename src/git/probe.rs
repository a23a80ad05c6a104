//! git::probe
//!
//! Memoized yes/no facts about the repository.
//!
//! Several steps of one CLI invocation ask the same questions (is a remote
//! linked? does it have commits? does trunk exist?). Each fact is answered by
//! one git invocation the first time it is asked and served from the cache
//! afterwards, which bounds the number of subprocesses per invocation.
//!
//! # Invariants
//!
//! - A fact is computed at most once per [`ProbeCache`] unless probing fails
//! - Failed probes are not cached, so the caller may retry
//! - Facts are only overwritten through [`ProbeCache::record`], by the engine
//!   step that just made them true (first commit, first push)
//! - A new cache (a new process) always re-probes

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use super::runner::{GitError, GitRunner};
use crate::core::types::BranchName;

/// The questions the cache can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    /// A remote is configured (`git remote` prints something).
    RemoteConfigured,
    /// The remote advertises at least one branch.
    RemoteHasCommits,
    /// `HEAD` resolves to a commit.
    LocalHasCommits,
    /// The working file differs from the index/HEAD or is untracked.
    WorkingFileDirty,
    /// The trunk branch exists locally.
    TrunkExists,
}

impl Probe {
    #[cfg(test)]
    const ALL: [Probe; 5] = [
        Probe::RemoteConfigured,
        Probe::RemoteHasCommits,
        Probe::LocalHasCommits,
        Probe::WorkingFileDirty,
        Probe::TrunkExists,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Probe::RemoteConfigured => "remote configured",
            Probe::RemoteHasCommits => "remote has commits",
            Probe::LocalHasCommits => "local has commits",
            Probe::WorkingFileDirty => "working file dirty",
            Probe::TrunkExists => "trunk exists",
        }
    }
}

/// Per-session memo of repository facts.
#[derive(Debug)]
pub struct ProbeCache {
    remote: String,
    trunk: BranchName,
    data_file: String,
    facts: Mutex<[Option<bool>; 5]>,
    aligned: AtomicBool,
}

impl ProbeCache {
    /// Create an empty cache for the given remote, trunk and working file.
    pub fn new(remote: impl Into<String>, trunk: BranchName, data_file: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            trunk,
            data_file: data_file.into(),
            facts: Mutex::new([None; 5]),
            aligned: AtomicBool::new(false),
        }
    }

    /// Return the cached answer or compute, store and return it.
    ///
    /// The table lock is held while probing so concurrent askers never run
    /// the same query twice.
    fn get_or_probe(
        &self,
        probe: Probe,
        compute: impl FnOnce() -> Result<bool, GitError>,
    ) -> Result<bool, GitError> {
        let mut facts = self.facts.lock();
        if let Some(value) = facts[probe.slot()] {
            return Ok(value);
        }
        let value = compute()?;
        tracing::debug!(probe = probe.label(), value, "probed");
        facts[probe.slot()] = Some(value);
        Ok(value)
    }

    /// Whether a remote is configured.
    pub fn remote_configured(&self, git: &dyn GitRunner) -> Result<bool, GitError> {
        self.get_or_probe(Probe::RemoteConfigured, || {
            Ok(!git.run(&["remote"])?.is_empty())
        })
    }

    /// Whether the remote has any branch. `false` without a remote.
    pub fn remote_has_commits(&self, git: &dyn GitRunner) -> Result<bool, GitError> {
        if !self.remote_configured(git)? {
            self.record(Probe::RemoteHasCommits, false);
            return Ok(false);
        }
        self.get_or_probe(Probe::RemoteHasCommits, || {
            Ok(!git.run(&["ls-remote", "--heads", &self.remote])?.is_empty())
        })
    }

    /// Whether the local repository has at least one commit.
    pub fn local_has_commits(&self, git: &dyn GitRunner) -> Result<bool, GitError> {
        self.get_or_probe(Probe::LocalHasCommits, || {
            git.succeeds(&["rev-parse", "--verify", "HEAD"])
        })
    }

    /// Whether the working file has uncommitted content.
    pub fn working_file_dirty(&self, git: &dyn GitRunner) -> Result<bool, GitError> {
        self.get_or_probe(Probe::WorkingFileDirty, || {
            Ok(!git
                .run(&["status", "--porcelain", "--", &self.data_file])?
                .is_empty())
        })
    }

    /// Whether the trunk branch exists locally.
    pub fn trunk_exists(&self, git: &dyn GitRunner) -> Result<bool, GitError> {
        self.get_or_probe(Probe::TrunkExists, || {
            git.succeeds(&["show-ref", "--verify", "--quiet", &self.trunk.refname()])
        })
    }

    #[cfg(test)]
    fn get(&self, probe: Probe, git: &dyn GitRunner) -> Result<bool, GitError> {
        match probe {
            Probe::RemoteConfigured => self.remote_configured(git),
            Probe::RemoteHasCommits => self.remote_has_commits(git),
            Probe::LocalHasCommits => self.local_has_commits(git),
            Probe::WorkingFileDirty => self.working_file_dirty(git),
            Probe::TrunkExists => self.trunk_exists(git),
        }
    }

    /// The cached answer, without probing.
    pub fn cached(&self, probe: Probe) -> Option<bool> {
        self.facts.lock()[probe.slot()]
    }

    /// Overwrite a fact the engine has just changed itself.
    pub fn record(&self, probe: Probe, value: bool) {
        let mut facts = self.facts.lock();
        if facts[probe.slot()] != Some(value) {
            tracing::debug!(probe = probe.label(), value, "recorded");
        }
        facts[probe.slot()] = Some(value);
    }

    /// Whether trunk was already pulled from the remote this session.
    pub fn is_aligned(&self) -> bool {
        self.aligned.load(Ordering::Acquire)
    }

    /// Remember that trunk has been pulled from the remote this session.
    pub fn mark_aligned(&self) {
        self.aligned.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::{GitOutput, ProcessRunner};
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Counts invocations of the wrapped runner.
    #[derive(Debug)]
    struct Counting {
        inner: ProcessRunner,
        calls: AtomicUsize,
    }

    impl GitRunner for Counting {
        fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.run(args)
        }

        fn workdir(&self) -> &Path {
            self.inner.workdir()
        }
    }

    fn fresh_repo() -> (TempDir, Counting) {
        let temp = TempDir::new().unwrap();
        let inner = ProcessRunner::new("git", temp.path()).with_identity("T", "t@example.com");
        inner.run(&["init"]).unwrap();
        let counting = Counting {
            inner,
            calls: AtomicUsize::new(0),
        };
        (temp, counting)
    }

    fn cache() -> ProbeCache {
        ProbeCache::new("origin", BranchName::new("main").unwrap(), "data.db")
    }

    #[test]
    fn each_fact_probed_once() {
        let (_temp, git) = fresh_repo();
        let probes = cache();

        for probe in Probe::ALL {
            probes.get(probe, &git).unwrap();
        }
        let after_first = git.calls.load(Ordering::SeqCst);

        for probe in Probe::ALL {
            probes.get(probe, &git).unwrap();
        }
        assert_eq!(git.calls.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn fresh_repo_answers() {
        let (temp, git) = fresh_repo();
        std::fs::write(temp.path().join("data.db"), b"").unwrap();
        let probes = cache();

        assert!(!probes.remote_configured(&git).unwrap());
        assert!(!probes.remote_has_commits(&git).unwrap());
        assert!(!probes.local_has_commits(&git).unwrap());
        assert!(probes.working_file_dirty(&git).unwrap());
        assert!(!probes.trunk_exists(&git).unwrap());
    }

    #[test]
    fn no_remote_skips_ls_remote() {
        let (_temp, git) = fresh_repo();
        let probes = cache();
        assert!(!probes.remote_has_commits(&git).unwrap());
        // Only `git remote` ran.
        assert_eq!(git.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn record_overrides_cached_value() {
        let (_temp, git) = fresh_repo();
        let probes = cache();
        assert!(!probes.local_has_commits(&git).unwrap());
        probes.record(Probe::LocalHasCommits, true);
        assert!(probes.local_has_commits(&git).unwrap());
        assert_eq!(probes.cached(Probe::LocalHasCommits), Some(true));
    }

    #[test]
    fn failed_probe_is_not_cached() {
        let temp = TempDir::new().unwrap();
        // Not a repository: `git remote` fails.
        let git = ProcessRunner::new("git", temp.path());
        let probes = cache();
        assert!(probes.remote_configured(&git).is_err());
        assert_eq!(probes.cached(Probe::RemoteConfigured), None);
    }

    #[test]
    fn alignment_flag() {
        let probes = cache();
        assert!(!probes.is_aligned());
        probes.mark_aligned();
        assert!(probes.is_aligned());
    }
}
