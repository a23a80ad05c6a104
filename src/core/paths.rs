//! core::paths
//!
//! Centralized path routing for everything aio keeps on disk.
//!
//! # Architecture
//!
//! Every git invocation and every file operation happens relative to the
//! application home, never the caller's current directory, so results do not
//! depend on where the CLI was started from. All locations must be computed
//! through [`AppPaths`].
//!
//! # Storage Layout
//!
//! ```text
//! <home>/
//!   data.db                  the versioned working file
//!   data_backup_<stamp>.db   safety copies written by revert
//!   .gitignore               excludes everything except the working file
//!   aio.toml                 optional configuration
//!   logs/                    daily log files
//!   .git/aio/lock            advisory writer lock
//! ```
//!
//! # Example
//!
//! ```
//! use aio::core::paths::AppPaths;
//! use std::path::PathBuf;
//!
//! let paths = AppPaths::new(PathBuf::from("/opt/aio"), "data.db");
//! assert_eq!(paths.data_file(), PathBuf::from("/opt/aio/data.db"));
//! assert_eq!(paths.lock_path(), PathBuf::from("/opt/aio/.git/aio/lock"));
//! ```

use std::path::{Path, PathBuf};

/// Environment variable overriding the application home.
pub const HOME_ENV: &str = "AIO_HOME";

/// Name of the optional configuration file inside the home directory.
pub const CONFIG_FILE: &str = "aio.toml";

/// Path routing for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Application home (working directory for every git invocation).
    pub home: PathBuf,
    /// Bare file name of the working file, relative to `home`.
    data_file_name: String,
}

impl AppPaths {
    /// Create paths rooted at `home` for the given data file name.
    pub fn new(home: PathBuf, data_file_name: impl Into<String>) -> Self {
        Self {
            home,
            data_file_name: data_file_name.into(),
        }
    }

    /// Resolve the application home directory.
    ///
    /// Precedence: explicit override (the `--home` flag), then `$AIO_HOME`,
    /// then the directory holding the running executable.
    pub fn resolve_home(explicit: Option<&Path>) -> std::io::Result<PathBuf> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }
        if let Ok(dir) = std::env::var(HOME_ENV) {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        let exe = std::env::current_exe()?;
        exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("executable has no parent directory: {}", exe.display()),
            )
        })
    }

    /// The application home as a Path reference.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Bare file name of the working file (as passed to git pathspecs).
    pub fn data_file_name(&self) -> &str {
        &self.data_file_name
    }

    /// Absolute path of the working file.
    pub fn data_file(&self) -> PathBuf {
        self.home.join(&self.data_file_name)
    }

    /// The version-control metadata directory.
    pub fn git_dir(&self) -> PathBuf {
        self.home.join(".git")
    }

    /// Whether the repository has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.git_dir().exists()
    }

    /// The ignore-rules file.
    pub fn ignore_file(&self) -> PathBuf {
        self.home.join(".gitignore")
    }

    /// Directory for aio's private state inside `.git`.
    pub fn state_dir(&self) -> PathBuf {
        self.git_dir().join("aio")
    }

    /// The advisory writer lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("lock")
    }

    /// The optional configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// Directory receiving log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    /// Location for a backup of the working file with the given file name.
    pub fn backup_path(&self, file_name: &str) -> PathBuf {
        self.home.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> AppPaths {
        AppPaths::new(PathBuf::from("/srv/aio"), "data.db")
    }

    #[test]
    fn layout_is_rooted_at_home() {
        let p = paths();
        assert_eq!(p.data_file(), PathBuf::from("/srv/aio/data.db"));
        assert_eq!(p.ignore_file(), PathBuf::from("/srv/aio/.gitignore"));
        assert_eq!(p.config_path(), PathBuf::from("/srv/aio/aio.toml"));
        assert_eq!(p.logs_dir(), PathBuf::from("/srv/aio/logs"));
        assert_eq!(p.git_dir(), PathBuf::from("/srv/aio/.git"));
        assert_eq!(p.state_dir(), PathBuf::from("/srv/aio/.git/aio"));
        assert_eq!(
            p.backup_path("data_backup_1.db"),
            PathBuf::from("/srv/aio/data_backup_1.db")
        );
    }

    #[test]
    fn explicit_home_wins() {
        let dir = PathBuf::from("/explicit");
        assert_eq!(AppPaths::resolve_home(Some(&dir)).unwrap(), dir);
    }

    #[test]
    fn initialized_tracks_git_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let p = AppPaths::new(temp.path().to_path_buf(), "data.db");
        assert!(!p.is_initialized());
        std::fs::create_dir(p.git_dir()).unwrap();
        assert!(p.is_initialized());
    }
}
