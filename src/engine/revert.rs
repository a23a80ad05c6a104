//! engine::revert
//!
//! Restore the working file to a recorded version as a new commit.
//!
//! The current file is copied to `data_backup_<stamp>.db` before anything is
//! touched; every failure after that point names the copy. History is never
//! rewritten: reverting adds one commit on trunk.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;

use super::{Engine, EngineError};
use crate::core::naming;
use crate::core::ops::DataLock;
use crate::core::types::CommitRecord;
use crate::ui::prompts::PromptError;

/// Question asked before a revert.
pub const CONFIRM_REVERT: &str = "Are you sure you want to revert the database?";

/// Heading of the version list.
pub const SELECT_VERSION: &str = "Select the version to revert to:";

/// Safety copies from the same second get a numeric suffix; give up after this.
const MAX_BACKUP_ATTEMPTS: u32 = 100;

/// What a revert did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RevertOutcome {
    /// The user declined.
    Cancelled,
    /// The working file already matched the chosen version.
    AlreadyAtVersion { hash: String, backup: PathBuf },
    /// The chosen version was restored and committed.
    Reverted {
        hash: String,
        subject: String,
        backup: PathBuf,
    },
}

impl Engine {
    /// Ask whether to go ahead with a revert.
    pub fn confirm_revert(&self) -> Result<bool, EngineError> {
        let confirmed = self.prompter.confirm(CONFIRM_REVERT, false)?;
        if !confirmed {
            tracing::info!("revert cancelled");
        }
        Ok(confirmed)
    }

    /// Interactively pick a recorded version and restore it.
    pub fn revert(&self) -> Result<RevertOutcome, EngineError> {
        if !self.confirm_revert()? {
            return Ok(RevertOutcome::Cancelled);
        }

        self.joiner.wait_all()?;
        let _lock = DataLock::acquire(&self.paths)?;

        let history = self.history()?;
        if history.is_empty() {
            return Err(EngineError::NoHistory);
        }

        let options: Vec<String> = history.iter().map(ToString::to_string).collect();
        let index = self.prompter.select(SELECT_VERSION, &options, Some(0))?;
        let record = history.get(index).ok_or(PromptError::InvalidSelection {
            index,
            options: options.len(),
        })?;
        self.revert_locked(record)
    }

    /// Restore the working file to `record` without asking.
    ///
    /// Callers confirm first, see [`Engine::confirm_revert`].
    pub fn revert_to(&self, record: &CommitRecord) -> Result<RevertOutcome, EngineError> {
        self.joiner.wait_all()?;
        let _lock = DataLock::acquire(&self.paths)?;
        self.revert_locked(record)
    }

    fn revert_locked(&self, record: &CommitRecord) -> Result<RevertOutcome, EngineError> {
        self.checkout_trunk()?;
        let backup = self.backup_data_file()?;
        tracing::info!(backup = %backup.display(), "data file backed up");

        let outcome = self.restore_version(record, &backup);
        outcome.map_err(|e| {
            tracing::error!(hash = %record.hash, error = %e, "revert failed");
            EngineError::RevertFailed {
                backup,
                source: Box::new(e),
            }
        })
    }

    fn restore_version(
        &self,
        record: &CommitRecord,
        backup: &std::path::Path,
    ) -> Result<RevertOutcome, EngineError> {
        let file = self.paths.data_file_name();
        self.git().run(&["checkout", &record.hash, "--", file])?;
        self.git().run(&["add", "--", file])?;

        if self.git().succeeds(&["diff", "--cached", "--quiet", "--", file])? {
            tracing::info!(hash = %record.hash, "data file already at this version");
            return Ok(RevertOutcome::AlreadyAtVersion {
                hash: record.hash.clone(),
                backup: backup.to_path_buf(),
            });
        }

        let subject = naming::revert_subject(&record.hash);
        self.git().run(&["commit", "-m", &subject])?;
        tracing::info!(hash = %record.hash, date = %record.date, "database reverted");
        Ok(RevertOutcome::Reverted {
            hash: record.hash.clone(),
            subject,
            backup: backup.to_path_buf(),
        })
    }

    /// Copy the working file to a new, never-overwriting backup path.
    fn backup_data_file(&self) -> Result<PathBuf, EngineError> {
        let source = self.paths.data_file();
        let mut input =
            fs::File::open(&source).map_err(|e| EngineError::io("opening data file", e))?;
        let now = Local::now();

        for attempt in 0..MAX_BACKUP_ATTEMPTS {
            let name = naming::backup_file_name(self.paths.data_file_name(), now, attempt);
            let target = self.paths.backup_path(&name);
            let mut out = match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(EngineError::io("creating backup", e)),
            };
            io::copy(&mut input, &mut out).map_err(|e| EngineError::io("writing backup", e))?;
            out.sync_all()
                .map_err(|e| EngineError::io("writing backup", e))?;
            return Ok(target);
        }

        Err(EngineError::io(
            "creating backup",
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} backups already exist for this second", MAX_BACKUP_ATTEMPTS),
            ),
        ))
    }
}
