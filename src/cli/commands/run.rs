//! run command - Run a program as one recorded change

use std::process::Command as Process;

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;

/// Run `command` inside the application home as a transaction.
///
/// A non-zero exit status is a failed mutation: the data file is restored
/// and nothing is recorded.
pub fn run(ctx: &Context, command: &[String]) -> Result<()> {
    let (program, args) = match command.split_first() {
        Some(split) => split,
        None => bail!("no command given"),
    };
    let home = ctx.engine.paths().home().to_path_buf();

    let outcome = ctx.engine.transaction(|| {
        let status = Process::new(program)
            .args(args)
            .current_dir(&home)
            .status()
            .with_context(|| format!("failed to start '{}'", program))?;
        if !status.success() {
            bail!("'{}' exited with {}", program, status);
        }
        Ok(())
    })?;

    tracing::info!(branch = %outcome.branch, program = %program, "change applied");
    ctx.print(format!("Recorded change ({})", outcome.branch));
    Ok(())
}
