//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--home <path>`: Use this application home instead of `$AIO_HOME` or
//!   the executable's directory
//! - `--debug`: Mirror logs to stderr
//! - `--no-interactive`: Never prompt
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// aio - life tracking with a versioned single-file database
#[derive(Parser, Debug)]
#[command(name = "aio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application home (holds data.db and its history)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Mirror log output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether prompts may be shown (a TTY is still required).
    pub fn allow_interactive(&self) -> bool {
        !(self.no_interactive || self.quiet)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set up the repository (runs automatically before every command)
    #[command(
        name = "init",
        long_about = "Set up version control for the data file.\n\n\
            Creates the repository, optionally links a remote, writes the ignore file \
            and records the first version of the data file. Running it again is harmless.",
        after_help = "\
EXAMPLES:
    # Interactive setup (asks whether to link a remote)
    aio init

    # Link a GitHub repository without prompting
    aio init --remote me/life-data"
    )]
    Init {
        /// Remote to link on first setup: owner/repo or a full URL/path
        #[arg(long, value_name = "REMOTE")]
        remote: Option<String>,
    },

    /// Run a program that changes the data file, recording the change
    #[command(
        name = "run",
        long_about = "Run a program inside the application home as one recorded change.\n\n\
            The change is made on a temporary branch. If the program fails, the data file \
            is restored and nothing is recorded; otherwise the change is committed and \
            merged into trunk.",
        after_help = "\
EXAMPLES:
    aio run -- sqlite3 data.db \"insert into habits(name) values ('read')\""
    )]
    Run {
        /// Program and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Commit stray changes to the data file and push
    #[command(name = "save")]
    Save,

    /// Push trunk to the remote if it has new commits
    #[command(name = "push")]
    Push,

    /// Restore the data file to a recorded version
    #[command(
        name = "revert",
        long_about = "Restore the data file to a recorded version.\n\n\
            The current file is copied to data_backup_<timestamp>.db first. The restored \
            version is recorded as a new commit; history is never rewritten.",
        after_help = "\
EXAMPLES:
    # Pick a version from a list
    aio revert

    # Restore a specific version, confirming first
    aio revert --to 1a2b3c4

    # Restore a specific version without prompting
    aio revert --to 1a2b3c4 --yes"
    )]
    Revert {
        /// Commit hash (or unique prefix) to restore, skipping the version list
        #[arg(long, value_name = "HASH")]
        to: Option<String>,

        /// Skip the confirmation (only with --to)
        #[arg(short = 'y', long, requires = "to")]
        yes: bool,
    },

    /// List recorded versions of the data file
    #[command(name = "log")]
    Log {
        /// Show at most this many entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the state of the data file and repository
    #[command(name = "status")]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    aio completion bash > ~/.local/share/bash-completion/completions/aio
    aio completion zsh > ~/.zfunc/_aio"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells supported by `aio completion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_keeps_hyphenated_arguments() {
        let cli = Cli::try_parse_from(["aio", "run", "--", "sqlite3", "-bail", "data.db"]).unwrap();
        match cli.command {
            Command::Run { command } => assert_eq!(command, ["sqlite3", "-bail", "data.db"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["aio", "status", "--home", "/tmp/x", "-q"]).unwrap();
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/x")));
        assert!(cli.quiet);
        assert!(!cli.allow_interactive());
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["aio", "run"]).is_err());
    }

    #[test]
    fn revert_yes_needs_a_version() {
        let cli = Cli::try_parse_from(["aio", "revert", "--to", "abc1234", "-y"]).unwrap();
        match cli.command {
            Command::Revert { to, yes } => {
                assert_eq!(to.as_deref(), Some("abc1234"));
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["aio", "revert", "--yes"]).is_err());
    }
}
