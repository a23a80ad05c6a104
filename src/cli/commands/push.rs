//! push command - Mirror trunk to the remote

use anyhow::Result;

use super::save::capitalize;
use crate::cli::Context;

/// Push trunk if the remote is behind.
pub fn push(ctx: &Context) -> Result<()> {
    let outcome = ctx.engine.push()?;
    ctx.print(capitalize(&outcome.to_string()));
    Ok(())
}
