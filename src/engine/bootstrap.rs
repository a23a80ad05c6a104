//! engine::bootstrap
//!
//! Idempotent repository setup, run before every command.
//!
//! # Steps
//!
//! Only when `<home>/.git` does not exist yet:
//!
//! 1. `git init`
//! 2. Offer to link a remote (skipped when non-interactive)
//! 3. If the remote already has history: fetch it and fast-forward trunk
//! 4. Write `.gitignore` so only the working file is tracked
//!
//! On every call:
//!
//! 5. Create an empty working file if it is missing
//! 6. Record it as the initial commit when there is no history anywhere
//!
//! Every failure is wrapped in [`EngineError::Bootstrap`], which is fatal.

use std::fs::{self, OpenOptions};
use std::io;

use serde::Serialize;

use super::{Engine, EngineError};
use crate::git::{GitError, Probe};
use crate::ui::prompts::PromptError;

/// Subject of the first commit of a fresh repository.
pub const INITIAL_COMMIT_SUBJECT: &str = "initial commit";

/// What a bootstrap run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// `git init` ran.
    pub initialized: bool,
    /// URL of the remote linked during this run.
    pub remote_linked: Option<String>,
    /// Existing remote history was fetched and checked out.
    pub fetched: bool,
    /// The ignore file was written.
    pub ignore_written: bool,
    /// An empty working file was created.
    pub data_file_created: bool,
    /// The initial commit was made.
    pub initial_commit: bool,
}

/// Contents of the ignore file: ignore everything but the working file.
pub fn ignore_rules(data_file: &str) -> String {
    format!("*\n!{}\n", data_file)
}

/// Turn the answer to the remote prompt into a URL.
///
/// Anything that already looks like a URL or a filesystem path is used as
/// given; a bare `owner/repo` is prefixed with `prefix`.
///
/// # Example
///
/// ```
/// use aio::engine::bootstrap::remote_url;
///
/// let prefix = "git@github.com:";
/// assert_eq!(remote_url("me/life", prefix), "git@github.com:me/life");
/// assert_eq!(remote_url("https://example.com/me/life.git", prefix), "https://example.com/me/life.git");
/// assert_eq!(remote_url("/srv/git/life.git", prefix), "/srv/git/life.git");
/// ```
pub fn remote_url(answer: &str, prefix: &str) -> String {
    let answer = answer.trim();
    let is_location = answer.contains("://")
        || answer.starts_with('/')
        || answer.starts_with('.')
        || answer.starts_with('~')
        || (answer.contains('@') && answer.contains(':'))
        || std::path::Path::new(answer).is_absolute();
    if is_location {
        answer.to_string()
    } else {
        format!("{}{}", prefix, answer)
    }
}

fn step<T, E: Into<EngineError>>(name: &'static str, result: Result<T, E>) -> Result<T, EngineError> {
    result.map_err(|e| EngineError::Bootstrap {
        step: name,
        source: Box::new(e.into()),
    })
}

impl Engine {
    /// Make sure the repository exists and has a first commit.
    ///
    /// Asks whether to link a remote on first run.
    pub fn bootstrap(&self) -> Result<BootstrapReport, EngineError> {
        self.bootstrap_with_remote(None)
    }

    /// Like [`Engine::bootstrap`], linking `remote` on first run without asking.
    ///
    /// `remote` is interpreted like the answer to the remote prompt.
    pub fn bootstrap_with_remote(&self, remote: Option<&str>) -> Result<BootstrapReport, EngineError> {
        let mut report = BootstrapReport::default();
        let home = self.paths.home();

        step(
            "create home",
            fs::create_dir_all(home).map_err(|e| EngineError::io("creating home directory", e)),
        )?;

        if !self.paths.is_initialized() {
            tracing::info!(home = %home.display(), "initializing repository");
            step("init", self.git().run(&["init"]))?;
            report.initialized = true;

            let url = match remote {
                Some(answer) => Some(remote_url(answer, self.config.remote_prefix())),
                None => step("link remote", self.ask_for_remote())?,
            };

            match url {
                Some(url) => {
                    step(
                        "link remote",
                        self.git()
                            .run(&["remote", "add", self.config.remote(), &url]),
                    )?;
                    self.probes.record(Probe::RemoteConfigured, true);
                    tracing::info!(remote = %self.config.remote(), url = %url, "remote linked");
                    report.remote_linked = Some(url);

                    if self.remote_history_or_offline() {
                        step("fetch", self.git().run(&["fetch", self.config.remote()]))?;
                        step("align trunk", self.align_trunk())?;
                        report.fetched = true;
                    }
                }
                None => self.probes.record(Probe::RemoteConfigured, false),
            }

            let ignore = self.paths.ignore_file();
            if !ignore.exists() {
                step(
                    "write ignore file",
                    fs::write(&ignore, ignore_rules(self.paths.data_file_name()))
                        .map_err(|e| EngineError::io("writing .gitignore", e)),
                )?;
                tracing::info!(file = %ignore.display(), "ignore file created");
                report.ignore_written = true;
            }
        }

        report.data_file_created = step("create data file", self.ensure_data_file())?;

        if step("probe", self.needs_initial_commit().map_err(EngineError::Probe))? {
            step("initial commit", self.initial_commit())?;
            report.initial_commit = true;
        }

        tracing::debug!(?report, "bootstrap complete");
        Ok(report)
    }

    /// Ask the user for a remote; `None` when declined or not interactive.
    fn ask_for_remote(&self) -> Result<Option<String>, EngineError> {
        if !self.prompter.is_interactive() {
            tracing::debug!("non-interactive, not linking a remote");
            return Ok(None);
        }

        let answer = match self
            .prompter
            .confirm("Do you want to add a link to a remote repository?", false)
        {
            Ok(true) => self
                .prompter
                .input("Remote repository (YourUsername/repo-name)", None),
            Ok(false) => return Ok(None),
            Err(e) => Err(e),
        };

        match answer {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(remote_url(&text, self.config.remote_prefix()))),
            Err(PromptError::NotInteractive | PromptError::Cancelled) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the remote has history; unreachable remotes count as empty.
    pub(crate) fn remote_history_or_offline(&self) -> bool {
        match self.probes.remote_has_commits(self.git()) {
            Ok(has) => has,
            Err(e) => {
                tracing::warn!(error = %e, "remote unreachable, continuing offline");
                false
            }
        }
    }

    /// Check out trunk and fast-forward it from the remote, once per session.
    ///
    /// A trunk that has diverged from the remote is left as it was; the
    /// repository never stays in a half-finished merge.
    pub(crate) fn align_trunk(&self) -> Result<(), GitError> {
        self.checkout_trunk()?;
        let pulled = self.git().run(&[
            "pull",
            "--ff-only",
            self.config.remote(),
            self.trunk.as_str(),
        ]);
        if let Err(e) = pulled {
            if self
                .git()
                .succeeds(&["rev-parse", "--quiet", "--verify", "MERGE_HEAD"])?
            {
                self.git().run(&["merge", "--abort"])?;
            }
            tracing::warn!(trunk = %self.trunk, error = %e, "trunk cannot be fast-forwarded");
            return Err(e);
        }
        self.probes.mark_aligned();
        self.probes.record(Probe::LocalHasCommits, true);
        tracing::info!(trunk = %self.trunk, "trunk aligned with remote");
        Ok(())
    }

    /// Create an empty working file. Returns whether it was missing.
    fn ensure_data_file(&self) -> Result<bool, EngineError> {
        let path = self.paths.data_file();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                tracing::info!(file = %path.display(), "created empty data file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(EngineError::io("creating data file", e)),
        }
    }

    fn needs_initial_commit(&self) -> Result<bool, GitError> {
        if !self.probes.working_file_dirty(self.git())? {
            return Ok(false);
        }
        if self.probes.local_has_commits(self.git())? {
            return Ok(false);
        }
        Ok(!self.remote_history_or_offline())
    }

    fn initial_commit(&self) -> Result<(), GitError> {
        let file = self.paths.data_file_name();
        self.git().run(&["add", "--", file])?;
        self.git().run(&["commit", "-m", INITIAL_COMMIT_SUBJECT])?;
        self.git().run(&["branch", "-M", self.trunk.as_str()])?;

        self.probes.record(Probe::LocalHasCommits, true);
        self.probes.record(Probe::TrunkExists, true);
        self.probes.record(Probe::WorkingFileDirty, false);
        tracing::info!(trunk = %self.trunk, "initial commit recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_rules_whitelist_data_file() {
        assert_eq!(ignore_rules("data.db"), "*\n!data.db\n");
    }

    #[test]
    fn remote_url_prefixes_short_names() {
        let prefix = "git@github.com:";
        assert_eq!(remote_url(" me/life ", prefix), "git@github.com:me/life");
        assert_eq!(
            remote_url("git@gitlab.com:me/life.git", prefix),
            "git@gitlab.com:me/life.git"
        );
        assert_eq!(remote_url("./remote.git", prefix), "./remote.git");
        assert_eq!(
            remote_url("ssh://host/life.git", prefix),
            "ssh://host/life.git"
        );
    }
}
