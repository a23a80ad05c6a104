//! Shared fixtures for integration tests.
//!
//! Every test gets its own application home in a temp dir, real git, and
//! (when needed) a local bare repository standing in for the remote.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use aio::core::config::Config;
use aio::engine::Engine;
use aio::git::{GitError, GitOutput, GitRunner, ProcessRunner};
use aio::ui::prompts::{Answer, Prompter, ScriptedPrompter};

/// Configuration written into every test home.
pub const TEST_CONFIG: &str = r#"
[identity]
name = "Test User"
email = "test@example.com"

[sync]
push_retries = 1
retry_delay_ms = 10
"#;

/// An application home in a temp dir.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    /// Create an empty home with the test configuration.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(dir.path().join("aio.toml"), TEST_CONFIG).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_file(&self) -> PathBuf {
        self.path().join("data.db")
    }

    pub fn config(&self) -> Config {
        Config::load(self.path()).expect("test config loads")
    }

    /// A runner for this home that records every invocation.
    pub fn recording_runner(&self) -> Arc<RecordingRunner> {
        Arc::new(RecordingRunner::new(ProcessRunner::from_config(
            &self.config(),
            self.path(),
        )))
    }

    /// A non-interactive engine.
    pub fn engine(&self) -> Engine {
        self.engine_with_prompter(ScriptedPrompter::silent())
    }

    /// An engine answering prompts from `answers`.
    pub fn engine_answering(&self, answers: impl IntoIterator<Item = Answer>) -> Engine {
        self.engine_with_prompter(ScriptedPrompter::new(answers))
    }

    pub fn engine_with_prompter(&self, prompter: impl Prompter + 'static) -> Engine {
        Engine::new(self.path().to_path_buf(), self.config(), Box::new(prompter))
    }

    /// An engine whose git calls go through `runner`.
    pub fn engine_with_runner(&self, runner: Arc<RecordingRunner>) -> Engine {
        self.engine_with_runner_answering(runner, [])
    }

    pub fn engine_with_runner_answering(
        &self,
        runner: Arc<RecordingRunner>,
        answers: impl IntoIterator<Item = Answer>,
    ) -> Engine {
        Engine::with_runner(
            runner,
            self.path().to_path_buf(),
            self.config(),
            Box::new(ScriptedPrompter::new(answers)),
        )
    }

    /// Run git in the home directory and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        run_git(self.path(), args)
    }

    /// Local branch names.
    pub fn branches(&self) -> Vec<String> {
        self.git(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Branch checked out in the home.
    pub fn current_branch(&self) -> String {
        self.git(&["symbolic-ref", "--short", "HEAD"])
    }

    /// Contents of the data file as recorded on trunk.
    pub fn trunk_content(&self) -> String {
        self.git(&["show", "main:data.db"])
    }

    /// Subjects of every commit reachable from trunk, newest first.
    pub fn trunk_subjects(&self) -> Vec<String> {
        self.git(&["log", "--format=%s", "main"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn read_data(&self) -> Vec<u8> {
        std::fs::read(self.data_file()).unwrap()
    }

    pub fn write_data(&self, contents: &str) {
        std::fs::write(self.data_file(), contents).unwrap();
    }
}

/// A bare repository used as the remote.
pub struct BareRemote {
    dir: TempDir,
}

impl BareRemote {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "--bare", "--quiet"]);
        Self { dir }
    }

    /// Path usable as a remote URL.
    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    pub fn git(&self, args: &[&str]) -> String {
        run_git(self.dir.path(), args)
    }

    /// Subject of the newest commit on the remote trunk.
    pub fn trunk_head_subject(&self) -> String {
        self.git(&["log", "-1", "--format=%s", "main"])
    }
}

/// Run a git command in `dir`, panicking on failure.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Wraps the real runner, recording arguments and optionally slowing down
/// one subcommand.
#[derive(Debug)]
pub struct RecordingRunner {
    inner: ProcessRunner,
    calls: Mutex<Vec<Vec<String>>>,
    slow: Mutex<Option<(String, Duration)>>,
}

impl RecordingRunner {
    pub fn new(inner: ProcessRunner) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            slow: Mutex::new(None),
        }
    }

    /// Sleep before every invocation of `subcommand`.
    pub fn slow_down(&self, subcommand: &str, delay: Duration) {
        *self.slow.lock().unwrap() = Some((subcommand.to_string(), delay));
    }

    /// Every recorded invocation, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations whose first argument is `subcommand`.
    pub fn count(&self, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    /// Index of the first invocation satisfying `pred`.
    pub fn position(&self, pred: impl Fn(&[String]) -> bool) -> Option<usize> {
        self.calls().iter().position(|c| pred(c))
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl GitRunner for RecordingRunner {
    fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let delay = self
            .slow
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(sub, _)| args.first() == Some(&sub.as_str()))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());
        self.inner.run(args)
    }

    fn workdir(&self) -> &Path {
        self.inner.workdir()
    }
}
