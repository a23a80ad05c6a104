//! init command - Set up version control for the data file

use anyhow::Result;

use crate::cli::Context;

/// Bootstrap the repository and describe what was done.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `remote` - Remote to link on first setup instead of asking
pub fn init(ctx: &Context, remote: Option<&str>) -> Result<()> {
    let report = ctx.engine.bootstrap_with_remote(remote)?;
    let paths = ctx.engine.paths();

    if !report.initialized {
        ctx.print(format!(
            "Already initialized in {}",
            paths.home().display()
        ));
        if remote.is_some() {
            ctx.print("The remote is only linked on first setup; use `git remote` to change it.");
        }
    } else {
        ctx.print(format!("Initialized repository in {}", paths.home().display()));
    }

    if let Some(url) = &report.remote_linked {
        ctx.print(format!("Linked remote {} ({})", ctx.engine.config().remote(), url));
    }
    if report.fetched {
        ctx.print("Fetched existing history from the remote");
    }
    if report.data_file_created {
        ctx.print(format!("Created empty {}", paths.data_file_name()));
    }
    if report.initial_commit {
        ctx.print(format!("Recorded the first version of {}", paths.data_file_name()));
    }

    Ok(())
}
