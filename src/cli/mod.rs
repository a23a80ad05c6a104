//! cli
//!
//! Command-line interface layer for aio.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve the application home, load configuration, start logging
//! - Bootstrap the repository, then delegate to command handlers
//! - Join background commit jobs before exiting
//! - Report errors: the single place that decides between fatal and
//!   recoverable exits
//!
//! # Exit codes
//!
//! - `0` success
//! - `1` fatal error (`ERROR: ...` plus the log folder)
//! - `2` recoverable error (`error: ...`)

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell};

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::core::paths::AppPaths;
use crate::engine::{Engine, EngineError};
use crate::logging::{self, LogGuard, LogSettings};
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts::TerminalPrompter;

/// Everything a command handler needs.
pub struct Context {
    /// The session's engine.
    pub engine: Engine,
    /// Output verbosity from the global flags.
    pub verbosity: Verbosity,
    _log: LogGuard,
}

impl Context {
    /// Resolve home and configuration, start logging and build the engine.
    pub fn open(cli: &Cli) -> Result<Self> {
        let home = AppPaths::resolve_home(cli.home.as_deref())
            .context("cannot determine the application home")?;
        let config = Config::load(&home)?;
        let paths = AppPaths::new(home.clone(), config.data_file());

        let log = logging::init(LogSettings {
            dir: &paths.logs_dir(),
            level: config.log_level(),
            stderr: cli.debug,
            retention_days: config.log_retention_days(),
        });
        tracing::debug!(
            home = %home.display(),
            config = ?config.loaded_from(),
            command = ?cli.command,
            "session start"
        );

        let prompter = TerminalPrompter::new(cli.allow_interactive());
        Ok(Self {
            engine: Engine::new(home, config, Box::new(prompter)),
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
            _log: log,
        })
    }

    /// Print a message (respects quiet mode).
    pub fn print(&self, message: impl std::fmt::Display) {
        output::print(message, self.verbosity);
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> ExitCode {
    let cli = Cli::parse_args();

    if let Command::Completion { shell } = cli.command {
        return finish(commands::completion(shell), None);
    }

    let ctx = match Context::open(&cli) {
        Ok(ctx) => ctx,
        Err(err) => {
            let logs = AppPaths::resolve_home(cli.home.as_deref())
                .ok()
                .map(|home| home.join("logs"));
            return finish(Err(err), logs);
        }
    };

    let result = commands::dispatch(cli.command, &ctx);

    // Commit jobs always finish before the process ends.
    let joined = ctx.engine.wait_for_commits();
    let result = match (result, joined) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(join)) => Err(join.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(join)) => {
            tracing::error!(error = %join, "commit job failed after command error");
            Err(err)
        }
    };

    let logs = ctx.engine.paths().logs_dir();
    let code = finish(result, Some(logs));
    drop(ctx);
    code
}

/// Report the outcome and pick the exit code.
fn finish(result: Result<()>, logs_dir: Option<PathBuf>) -> ExitCode {
    let err = match result {
        Ok(()) => return ExitCode::SUCCESS,
        Err(err) => err,
    };

    if is_fatal(&err) {
        tracing::error!(error = ?err, "fatal");
        match logs_dir {
            Some(dir) => output::fatal(format!("{:#}", err), &dir),
            None => eprintln!("ERROR: {:#}", err),
        }
        ExitCode::from(1)
    } else {
        tracing::warn!(error = ?err, "command failed");
        output::error(format!("{:#}", err));
        ExitCode::from(2)
    }
}

/// Engine errors classify themselves; anything else is fatal.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .find_map(|e| e.downcast_ref::<EngineError>())
        .map_or(true, EngineError::is_fatal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ops::LockError;

    #[test]
    fn engine_errors_decide_fatality() {
        let recoverable = anyhow::Error::new(EngineError::Lock(LockError::AlreadyLocked))
            .context("saving");
        assert!(!is_fatal(&recoverable));

        let fatal = anyhow::Error::new(EngineError::CommitJobPanicked { job: "j".into() });
        assert!(is_fatal(&fatal));
    }

    #[test]
    fn foreign_errors_are_fatal() {
        assert!(is_fatal(&anyhow::anyhow!("something else")));
    }
}
