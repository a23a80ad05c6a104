//! revert command - Restore the data file to a recorded version

use anyhow::{bail, Result};

use crate::cli::Context;
use crate::core::types::CommitRecord;
use crate::engine::RevertOutcome;

/// Restore a recorded version, chosen interactively or by hash prefix.
///
/// `yes` skips the confirmation when a version is given.
pub fn revert(ctx: &Context, to: Option<&str>, yes: bool) -> Result<()> {
    let outcome = match to {
        Some(prefix) => {
            let history = ctx.engine.history()?;
            let record = find_version(&history, prefix)?;
            if yes || ctx.engine.confirm_revert()? {
                ctx.engine.revert_to(record)?
            } else {
                RevertOutcome::Cancelled
            }
        }
        None => ctx.engine.revert()?,
    };

    match outcome {
        RevertOutcome::Cancelled => ctx.print("Revert cancelled"),
        RevertOutcome::AlreadyAtVersion { hash, backup } => {
            ctx.print(format!("The data file already matches {}", hash));
            ctx.print(format!("Backup written to {}", backup.display()));
        }
        RevertOutcome::Reverted { hash, backup, .. } => {
            ctx.print(format!("Reverted the data file to {}", hash));
            ctx.print(format!("Previous version saved to {}", backup.display()));
        }
    }
    Ok(())
}

/// The single history entry whose hash starts with `prefix`.
fn find_version<'a>(history: &'a [CommitRecord], prefix: &str) -> Result<&'a CommitRecord> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        bail!("empty version hash");
    }

    let mut matches = history.iter().filter(|r| {
        r.hash.starts_with(prefix) || (prefix.len() > r.hash.len() && prefix.starts_with(&r.hash))
    });
    match (matches.next(), matches.next()) {
        (Some(record), None) => Ok(record),
        (None, _) => bail!("no recorded version matches '{}' (see `aio log`)", prefix),
        (Some(_), Some(_)) => bail!("'{}' matches more than one version; use more characters", prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<CommitRecord> {
        CommitRecord::parse_log(
            "abc1234|2024-10-17|merge mut-1\nabd5678|2024-10-16|changes-mut-0\n0ff1ce0|2024-10-15|initial commit",
        )
        .unwrap()
    }

    #[test]
    fn unique_prefix_matches() {
        let h = history();
        assert_eq!(find_version(&h, "0ff").unwrap().subject, "initial commit");
        assert_eq!(find_version(&h, "abc1").unwrap().hash, "abc1234");
    }

    #[test]
    fn full_hash_longer_than_abbreviation_matches() {
        let h = history();
        assert_eq!(find_version(&h, "abc1234deadbeef").unwrap().hash, "abc1234");
    }

    #[test]
    fn ambiguous_or_unknown_prefix_fails() {
        let h = history();
        assert!(find_version(&h, "ab").is_err());
        assert!(find_version(&h, "fff").is_err());
        assert!(find_version(&h, " ").is_err());
    }
}
