//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT run git directly. The repository is bootstrapped by
//! [`dispatch`] before any handler runs, the way every aio command has
//! always started.

mod completion;
mod init;
mod log_cmd;
mod push;
mod revert;
mod run;
mod save;
mod status;

pub use completion::completion;
pub use init::init;
pub use log_cmd::log;
pub use push::push;
pub use revert::revert;
pub use run::run;
pub use save::save;
pub use status::status;

use anyhow::Result;

use super::{Command, Context};

/// Bootstrap the repository and run one command.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    if let Command::Init { remote } = &command {
        return init(ctx, remote.as_deref());
    }

    ctx.engine.bootstrap()?;

    match command {
        Command::Init { .. } => Ok(()),
        Command::Run { command } => run(ctx, &command),
        Command::Save => save(ctx),
        Command::Push => push(ctx),
        Command::Revert { to, yes } => revert(ctx, to.as_deref(), yes),
        Command::Log { limit, json } => log(ctx, limit, json),
        Command::Status { json } => status(ctx, json),
        Command::Completion { shell } => completion(shell),
    }
}
