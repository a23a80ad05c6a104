//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name (trunk and mutation branches)
//! - [`CommitRecord`] - One history entry touching the data file
//! - [`ContentDigest`] - SHA-256 of the data file bytes
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented.
//!
//! # Examples
//!
//! ```
//! use aio::core::types::{BranchName, CommitRecord};
//!
//! let trunk = BranchName::new("main").unwrap();
//! assert_eq!(trunk.as_str(), "main");
//! assert!(BranchName::new("invalid..name").is_err());
//!
//! let record = CommitRecord::parse_log_line("1a2b3c4|2024-10-17|initial commit").unwrap();
//! assert_eq!(record.hash, "1a2b3c4");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Field separator used in the `git log --pretty` format the engine requests.
pub const LOG_FIELD_SEPARATOR: char = '|';

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("malformed history entry: {0}")]
    InvalidCommitRecord(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, ASCII control characters,
///   or any of ` ~^:\?*[`
///
/// # Example
///
/// ```
/// use aio::core::types::BranchName;
///
/// assert!(BranchName::new("main").is_ok());
/// assert!(BranchName::new("mut-20241017093000-1a2b3c4d").is_ok());
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(why.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for forbidden in ["..", "@{", "//"] {
            if name.contains(forbidden) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{forbidden}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') || component.ends_with(".lock") {
                return reject("path component cannot start with '.' or end with '.lock'");
            }
        }

        Ok(())
    }

    /// Wrap a name the crate built from known-valid parts.
    pub(crate) fn trusted(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(Self::validate(&name).is_ok(), "untrusted branch name {name:?}");
        Self(name)
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fully qualified ref for this branch (`refs/heads/<name>`).
    pub fn refname(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the data file's history.
///
/// Produced by `git log --pretty=format:%h|%ad|%s --date=short -- <file>`,
/// newest first. Consumed read-only when building the revert selection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Abbreviated commit hash.
    pub hash: String,
    /// Author date (`YYYY-MM-DD`).
    pub date: String,
    /// Commit subject line.
    pub subject: String,
}

impl CommitRecord {
    /// Parse one line of the engine's `git log` format.
    ///
    /// The subject is everything after the second separator, so subjects
    /// containing `|` survive intact.
    ///
    /// # Example
    ///
    /// ```
    /// use aio::core::types::CommitRecord;
    ///
    /// let r = CommitRecord::parse_log_line("abc1234|2024-10-17|a|b").unwrap();
    /// assert_eq!(r.subject, "a|b");
    /// assert!(CommitRecord::parse_log_line("no separators").is_err());
    /// ```
    pub fn parse_log_line(line: &str) -> Result<Self, TypeError> {
        let mut parts = line.splitn(3, LOG_FIELD_SEPARATOR);
        let (hash, date, subject) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(d), Some(s)) => (h.trim(), d.trim(), s.trim()),
            _ => return Err(TypeError::InvalidCommitRecord(line.to_string())),
        };

        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCommitRecord(line.to_string()));
        }

        Ok(Self {
            hash: hash.to_string(),
            date: date.to_string(),
            subject: subject.to_string(),
        })
    }

    /// Parse the full output of the history query, skipping blank lines.
    pub fn parse_log(output: &str) -> Result<Vec<Self>, TypeError> {
        output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(Self::parse_log_line)
            .collect()
    }
}

impl std::fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.hash, self.date, self.subject)
    }
}

/// SHA-256 digest of the data file contents.
///
/// Used to confirm that a rolled-back transaction left the file byte-identical
/// and to report the current content identity in `status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest an in-memory buffer.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Digest a file on disk.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::compute(&bytes))
    }

    /// Abbreviated form for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }

    /// Get the digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
