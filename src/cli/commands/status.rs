//! status command - Show the state of the data file and repository

use anyhow::Result;

use crate::cli::Context;
use crate::engine::StatusReport;
use crate::ui::output;

/// Describe the data file, trunk and remote.
pub fn status(ctx: &Context, json: bool) -> Result<()> {
    ctx.engine.wait_for_commits()?;
    let report = ctx.engine.status()?;

    if json {
        output::json(&report)?;
    } else {
        ctx.print(render(&report));
    }
    Ok(())
}

fn render(report: &StatusReport) -> String {
    let mut lines = vec![format!("Home:      {}", report.home.display())];

    let file = match (&report.digest, report.size) {
        (Some(digest), Some(size)) => format!(
            "{} ({} bytes, sha256 {})",
            report.data_file.display(),
            size,
            digest.short()
        ),
        _ => format!("{} (missing)", report.data_file.display()),
    };
    lines.push(format!("Data file: {}", file));

    let branch = report.current_branch.as_deref().unwrap_or("(none)");
    lines.push(format!("Branch:    {} (trunk: {})", branch, report.trunk));
    lines.push(format!(
        "Changes:   {}",
        if report.dirty { "unrecorded changes" } else { "clean" }
    ));
    lines.push(format!(
        "Remote:    {}",
        report.remote.as_deref().unwrap_or("not linked")
    ));
    if let Some(last) = &report.last_change {
        lines.push(format!("Last:      {}", last));
    }
    if !report.leftover_branches.is_empty() {
        lines.push(format!(
            "Leftover:  {} (unmerged changes)",
            report.leftover_branches.join(", ")
        ));
    }
    if report.pending_jobs > 0 {
        lines.push(format!("Pending:   {} commit job(s)", report.pending_jobs));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, CommitRecord, ContentDigest};
    use std::path::PathBuf;

    #[test]
    fn render_shows_key_facts() {
        let report = StatusReport {
            home: PathBuf::from("/srv/aio"),
            data_file: PathBuf::from("/srv/aio/data.db"),
            digest: Some(ContentDigest::compute(b"abc")),
            size: Some(3),
            trunk: BranchName::new("main").unwrap(),
            current_branch: Some("main".into()),
            dirty: false,
            remote: None,
            last_change: CommitRecord::parse_log_line("abc1234|2024-10-17|initial commit").ok(),
            pending_jobs: 0,
            leftover_branches: vec![],
        };
        let text = render(&report);
        assert!(text.contains("/srv/aio/data.db (3 bytes, sha256 ba7816bf8f01)"));
        assert!(text.contains("Branch:    main (trunk: main)"));
        assert!(text.contains("Remote:    not linked"));
        assert!(text.contains("Last:      abc1234 2024-10-17 initial commit"));
        assert!(!text.contains("Pending"));
        assert!(!text.contains("Leftover"));
    }

    #[test]
    fn render_lists_leftover_branches() {
        let report = StatusReport {
            home: PathBuf::from("/srv/aio"),
            data_file: PathBuf::from("/srv/aio/data.db"),
            digest: None,
            size: None,
            trunk: BranchName::new("main").unwrap(),
            current_branch: Some("main".into()),
            dirty: true,
            remote: Some("git@github.com:me/life".into()),
            last_change: None,
            pending_jobs: 1,
            leftover_branches: vec!["mut-20241017093000-0badc0de".into()],
        };
        let text = render(&report);
        assert!(text.contains("/srv/aio/data.db (missing)"));
        assert!(text.contains("Changes:   unrecorded changes"));
        assert!(text.contains("Leftover:  mut-20241017093000-0badc0de (unmerged changes)"));
        assert!(text.contains("Pending:   1 commit job(s)"));
    }
}
