//! git::runner
//!
//! Process runner for the git binary.
//!
//! Every invocation runs with the working directory pinned to the
//! application home, stdin closed and terminal prompts disabled, so results
//! are reproducible no matter where the CLI was started from and a missing
//! credential can never hang the process. Output is captured; a non-zero
//! exit becomes [`GitError::Failed`] carrying that output.
//!
//! There are no retries at this layer.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use thiserror::Error;

use crate::core::config::Config;

/// Errors from running git.
#[derive(Debug, Error)]
pub enum GitError {
    /// The configured git executable could not be found.
    #[error("git executable '{program}' not found; install git or set repository.git_binary")]
    BinaryNotFound {
        /// The program that was looked up
        program: String,
    },

    /// The process could not be started for another reason.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// The program that failed to start
        program: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// git exited with a non-zero status.
    #[error("git {args} failed: {}", detail(.stderr, .stdout))]
    Failed {
        /// The arguments passed to git, space-joined
        args: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// git succeeded but printed something the engine cannot interpret.
    #[error("unexpected output from git {args}: {message}")]
    InvalidOutput {
        /// The arguments passed to git, space-joined
        args: String,
        /// What was wrong with the output
        message: String,
    },
}

fn detail<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    let err = stderr.trim();
    if err.is_empty() {
        stdout.trim()
    } else {
        err
    }
}

impl GitError {
    /// Whether git ran and reported failure (as opposed to not running).
    pub fn is_exit_failure(&self) -> bool {
        matches!(self, GitError::Failed { .. })
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl GitOutput {
    /// Standard output with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Whether standard output is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.trimmed().is_empty()
    }
}

/// Something that can run git commands in the application home.
///
/// The engine only talks to git through this trait, so tests can wrap the
/// real runner to count or slow down particular invocations.
pub trait GitRunner: Send + Sync + fmt::Debug {
    /// Run `git <args>` and capture its output.
    fn run(&self, args: &[&str]) -> Result<GitOutput, GitError>;

    /// The directory every invocation runs in.
    fn workdir(&self) -> &Path;

    /// Run a query whose exit status is the answer.
    ///
    /// Returns `Ok(false)` when git ran and exited non-zero; other errors
    /// (git missing, spawn failure) are propagated.
    fn succeeds(&self, args: &[&str]) -> Result<bool, GitError> {
        match self.run(args) {
            Ok(_) => Ok(true),
            Err(e) if e.is_exit_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Runs the real git executable.
#[derive(Clone)]
pub struct ProcessRunner {
    program: String,
    workdir: PathBuf,
    identity: Option<(String, String)>,
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("program", &self.program)
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl ProcessRunner {
    /// Create a runner for `program` pinned to `workdir`.
    pub fn new(program: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
            identity: None,
        }
    }

    /// Create a runner from configuration (binary and commit identity).
    pub fn from_config(config: &Config, workdir: impl Into<PathBuf>) -> Self {
        let runner = Self::new(config.git_binary(), workdir);
        match config.identity() {
            Some((name, email)) => runner.with_identity(name, email),
            None => runner,
        }
    }

    /// Commit as the given identity regardless of the user's git config.
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = Some((name.into(), email.into()));
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some((name, email)) = &self.identity {
            cmd.arg("-c")
                .arg(format!("user.name={}", name))
                .arg("-c")
                .arg(format!("user.email={}", email));
        }
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl GitRunner for ProcessRunner {
    fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let joined = args.join(" ");
        let started = Instant::now();

        let output = self.command(args).output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                GitError::BinaryNotFound {
                    program: self.program.clone(),
                }
            } else {
                GitError::Spawn {
                    program: self.program.clone(),
                    source: e,
                }
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if output.status.success() {
            tracing::debug!(args = %joined, elapsed_ms, "git");
            Ok(GitOutput { stdout, stderr })
        } else {
            tracing::debug!(
                args = %joined,
                elapsed_ms,
                code = ?output.status.code(),
                stderr = %stderr.trim(),
                "git failed"
            );
            Err(GitError::Failed {
                args: joined,
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}
