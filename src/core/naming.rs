//! core::naming
//!
//! Naming rules for the refs and files the engine creates.
//!
//! # Features
//!
//! - Mutation branch names: `mut-<YYYYmmddHHMMSS>-<8 hex>`
//! - Commit subjects derived from those names
//! - Timestamped backup file names
//!
//! The random suffix keeps two transactions started within the same second
//! from colliding on the branch name.

use chrono::{DateTime, Local};

use crate::core::types::BranchName;

/// Prefix of every mutation branch.
pub const MUTATION_PREFIX: &str = "mut-";

/// Timestamp layout shared by branch names, autosave subjects and backups.
pub const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Generate a fresh mutation branch name for the given moment.
///
/// # Example
///
/// ```
/// use aio::core::naming::{mutation_branch_at, MUTATION_PREFIX};
///
/// let now = chrono::Local::now();
/// let a = mutation_branch_at(now);
/// let b = mutation_branch_at(now);
/// assert!(a.as_str().starts_with(MUTATION_PREFIX));
/// assert_ne!(a, b);
/// ```
pub fn mutation_branch_at(at: DateTime<Local>) -> BranchName {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let name = format!(
        "{}{}-{}",
        MUTATION_PREFIX,
        at.format(STAMP_FORMAT),
        &suffix[..8]
    );
    // Only digits, hex and '-' after a fixed prefix: always a valid refname.
    BranchName::trusted(name)
}

/// Generate a mutation branch name for the current moment.
pub fn mutation_branch() -> BranchName {
    mutation_branch_at(Local::now())
}

/// Whether a branch name was produced by [`mutation_branch`].
pub fn is_mutation_branch(name: &str) -> bool {
    name.strip_prefix(MUTATION_PREFIX)
        .and_then(|rest| rest.split_once('-'))
        .is_some_and(|(stamp, suffix)| {
            stamp.len() == 14
                && stamp.chars().all(|c| c.is_ascii_digit())
                && suffix.len() == 8
                && suffix.chars().all(|c| c.is_ascii_hexdigit())
        })
}

/// Commit subject for the change recorded on a mutation branch.
pub fn change_subject(branch: &BranchName) -> String {
    format!("changes-{}", branch)
}

/// Merge commit subject when a mutation branch lands on trunk.
pub fn merge_subject(branch: &BranchName) -> String {
    format!("merge {}", branch)
}

/// Commit subject for stray changes picked up by `save`.
pub fn autosave_subject(at: DateTime<Local>) -> String {
    format!("autosave-{}", at.format(STAMP_FORMAT))
}

/// Commit subject for a snapshot revert.
pub fn revert_subject(hash: &str) -> String {
    format!("revert-database-to-{}", hash)
}

/// Backup file name for the data file, e.g. `data_backup_20241017093000.db`.
///
/// The extension of `data_file` is preserved; `attempt > 0` appends a
/// numeric suffix so an existing backup from the same second is never
/// overwritten.
///
/// # Example
///
/// ```
/// use aio::core::naming::backup_file_name;
/// use chrono::TimeZone;
///
/// let at = chrono::Local.with_ymd_and_hms(2024, 10, 17, 9, 30, 0).unwrap();
/// assert_eq!(backup_file_name("data.db", at, 0), "data_backup_20241017093000.db");
/// assert_eq!(backup_file_name("data.db", at, 2), "data_backup_20241017093000_2.db");
/// ```
pub fn backup_file_name(data_file: &str, at: DateTime<Local>, attempt: u32) -> String {
    let (stem, ext) = match data_file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (data_file, None),
    };
    let mut name = format!("{}_backup_{}", stem, at.format(STAMP_FORMAT));
    if attempt > 0 {
        name.push_str(&format!("_{}", attempt));
    }
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(ext);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn fixed() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 10, 17, 9, 30, 0).unwrap()
    }

    #[test]
    fn mutation_branch_layout() {
        let b = mutation_branch_at(fixed());
        assert!(b.as_str().starts_with("mut-20241017093000-"));
        assert_eq!(b.as_str().len(), "mut-20241017093000-".len() + 8);
        assert!(is_mutation_branch(b.as_str()));
    }

    #[test]
    fn same_second_names_differ() {
        let names: std::collections::HashSet<_> =
            (0..64).map(|_| mutation_branch_at(fixed())).collect();
        assert_eq!(names.len(), 64);
    }

    #[test]
    fn recognizes_only_mutation_branches() {
        assert!(!is_mutation_branch("main"));
        assert!(!is_mutation_branch("mut-2024-abc"));
        assert!(!is_mutation_branch("mut-20241017093000-xyzxyzxy"));
    }

    #[test]
    fn subjects() {
        let b = BranchName::new("mut-20241017093000-0a1b2c3d").unwrap();
        assert_eq!(change_subject(&b), "changes-mut-20241017093000-0a1b2c3d");
        assert_eq!(merge_subject(&b), "merge mut-20241017093000-0a1b2c3d");
        assert_eq!(autosave_subject(fixed()), "autosave-20241017093000");
        assert_eq!(revert_subject("abc1234"), "revert-database-to-abc1234");
    }

    #[test]
    fn backup_without_extension() {
        assert_eq!(
            backup_file_name("store", fixed(), 0),
            "store_backup_20241017093000"
        );
    }

    proptest! {
        #[test]
        fn generated_names_are_valid_refs(secs in 0i64..4_000_000_000i64) {
            let at = Local.timestamp_opt(secs, 0).single().unwrap();
            let b = mutation_branch_at(at);
            prop_assert!(BranchName::new(b.as_str()).is_ok());
            prop_assert!(is_mutation_branch(b.as_str()));
        }
    }
}
