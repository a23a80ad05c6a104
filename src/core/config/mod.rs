//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! aio has a single, optional configuration file at `<home>/aio.toml`.
//! A missing file is not an error: every accessor falls back to a default.
//!
//! # Precedence
//!
//! 1. Default values
//! 2. `<home>/aio.toml`
//! 3. CLI flags and environment (`AIO_LOG`) (not handled here)
//!
//! # Example
//!
//! ```no_run
//! use aio::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("/opt/aio")).unwrap();
//! println!("trunk: {}", config.trunk());
//! println!("remote: {}", config.remote());
//! ```

pub mod schema;

pub use schema::{AppConfig, IdentityConfig, LoggingConfig, RepositoryConfig, SyncConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::paths::CONFIG_FILE;
use crate::core::types::BranchName;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Raw file contents (all fields optional)
    pub file: AppConfig,
    /// Path the configuration was loaded from, if a file existed
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load `<home>/aio.toml`, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let file: AppConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Self {
            file,
            loaded_from: Some(path),
        })
    }

    /// Build a configuration from an in-memory schema value.
    pub fn from_app_config(file: AppConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self {
            file,
            loaded_from: None,
        })
    }

    fn repository(&self) -> Option<&RepositoryConfig> {
        self.file.repository.as_ref()
    }

    /// Working file name. Defaults to "data.db".
    pub fn data_file(&self) -> &str {
        self.repository()
            .and_then(|r| r.data_file.as_deref())
            .unwrap_or("data.db")
    }

    /// Trunk branch. Defaults to "main".
    pub fn trunk(&self) -> BranchName {
        self.repository()
            .and_then(|r| r.trunk.as_deref())
            .and_then(|name| BranchName::new(name).ok())
            .unwrap_or_else(|| BranchName::trusted("main"))
    }

    /// Remote name. Defaults to "origin".
    pub fn remote(&self) -> &str {
        self.repository()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Prefix for short `owner/repo` remote answers.
    pub fn remote_prefix(&self) -> &str {
        self.repository()
            .and_then(|r| r.remote_prefix.as_deref())
            .unwrap_or("git@github.com:")
    }

    /// Git executable. Defaults to "git".
    pub fn git_binary(&self) -> &str {
        self.repository()
            .and_then(|r| r.git_binary.as_deref())
            .unwrap_or("git")
    }

    /// Commit identity override as `(name, email)`, if configured.
    pub fn identity(&self) -> Option<(&str, &str)> {
        let identity = self.file.identity.as_ref()?;
        match (identity.name.as_deref(), identity.email.as_deref()) {
            (Some(name), Some(email)) => Some((name, email)),
            _ => None,
        }
    }

    /// Extra push attempts after a failure. Defaults to 2.
    pub fn push_retries(&self) -> u32 {
        self.file
            .sync
            .as_ref()
            .and_then(|s| s.push_retries)
            .unwrap_or(2)
    }

    /// Initial retry back-off. Defaults to 500ms.
    pub fn retry_delay(&self) -> Duration {
        let ms = self
            .file
            .sync
            .as_ref()
            .and_then(|s| s.retry_delay_ms)
            .unwrap_or(500);
        Duration::from_millis(ms)
    }

    /// File log level. Defaults to "debug".
    pub fn log_level(&self) -> &str {
        self.file
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("debug")
    }

    /// Days of log files to keep. Defaults to 7.
    pub fn log_retention_days(&self) -> u64 {
        self.file
            .logging
            .as_ref()
            .and_then(|l| l.retention_days)
            .unwrap_or(7)
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
