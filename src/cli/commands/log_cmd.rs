//! log command - List recorded versions of the data file

use anyhow::Result;

use crate::cli::Context;
use crate::ui::output;

/// Print the data file's history, newest first.
pub fn log(ctx: &Context, limit: Option<usize>, json: bool) -> Result<()> {
    ctx.engine.wait_for_commits()?;
    let mut history = ctx.engine.history()?;
    if let Some(n) = limit {
        history.truncate(n);
    }

    if json {
        output::json(&history)?;
    } else if history.is_empty() {
        ctx.print("No recorded versions yet");
    } else {
        ctx.print(output::format_list(&history, ""));
    }
    Ok(())
}
