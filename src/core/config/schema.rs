//! core::config::schema
//!
//! Configuration schema types.
//!
//! Located at `<home>/aio.toml`. Every field is optional; accessors on
//! [`super::Config`] apply the defaults.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., trunk must be a valid
//! branch name, the data file must be a bare file name).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// The complete configuration file.
///
/// # Example
///
/// ```toml
/// [repository]
/// data_file = "data.db"
/// trunk = "main"
/// remote = "origin"
/// remote_prefix = "git@github.com:"
///
/// [identity]
/// name = "Ada"
/// email = "ada@example.com"
///
/// [sync]
/// push_retries = 2
/// retry_delay_ms = 500
///
/// [logging]
/// level = "debug"
/// retention_days = 7
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Repository layout and naming
    pub repository: Option<RepositoryConfig>,

    /// Commit identity passed to git with `-c`
    pub identity: Option<IdentityConfig>,

    /// Remote sync policy
    pub sync: Option<SyncConfig>,

    /// Log settings
    pub logging: Option<LoggingConfig>,
}

impl AppConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repo) = &self.repository {
            repo.validate()?;
        }
        if let Some(identity) = &self.identity {
            identity.validate()?;
        }
        if let Some(logging) = &self.logging {
            logging.validate()?;
        }
        Ok(())
    }
}

/// `[repository]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Working file name inside the home directory (default: "data.db")
    pub data_file: Option<String>,

    /// Trunk branch name (default: "main")
    pub trunk: Option<String>,

    /// Remote name (default: "origin")
    pub remote: Option<String>,

    /// Prefix applied to `owner/repo` answers when linking a remote
    /// (default: "git@github.com:")
    pub remote_prefix: Option<String>,

    /// Git executable (default: "git" on PATH)
    pub git_binary: Option<String>,
}

impl RepositoryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(trunk) = &self.trunk {
            BranchName::new(trunk.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid trunk '{}': {}", trunk, e))
            })?;
        }

        if let Some(remote) = &self.remote {
            // Remote names share the branch-name grammar but may not nest.
            if remote.contains('/') || BranchName::new(remote.as_str()).is_err() {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid remote name '{}'",
                    remote
                )));
            }
        }

        if let Some(file) = &self.data_file {
            let bare = !file.is_empty()
                && !file.contains('/')
                && !file.contains('\\')
                && file != "."
                && file != ".."
                && !file.starts_with(".git");
            if !bare {
                return Err(ConfigError::InvalidValue(format!(
                    "data_file must be a plain file name, got '{}'",
                    file
                )));
            }
        }

        if let Some(bin) = &self.git_binary {
            if bin.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "git_binary cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// `[identity]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Author/committer name
    pub name: Option<String>,

    /// Author/committer email
    pub email: Option<String>,
}

impl IdentityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.name, &self.email) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(ConfigError::InvalidValue(
                "identity requires both name and email".to_string(),
            )),
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Extra push attempts after a failure (default: 2)
    pub push_retries: Option<u32>,

    /// Delay before the first retry, doubled each attempt (default: 500)
    pub retry_delay_ms: Option<u64>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level written to the log file (default: "debug")
    pub level: Option<String>,

    /// Days of log files to keep; older files are removed at startup (default: 7)
    pub retention_days: Option<u64>,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.level {
            let valid = ["trace", "debug", "info", "warn", "error", "off"];
            if !valid.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log level '{}', must be one of: {}",
                    level,
                    valid.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let toml = r#"
            [repository]
            data_file = "life.db"
            trunk = "trunk"
            remote = "backup"

            [identity]
            name = "Ada"
            email = "ada@example.com"

            [sync]
            push_retries = 0

            [logging]
            level = "info"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        let repo = config.repository.unwrap();
        assert_eq!(repo.data_file.as_deref(), Some("life.db"));
        assert_eq!(config.sync.unwrap().push_retries, Some(0));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[repository]\nbranch = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_trunk_rejected() {
        let config = AppConfig {
            repository: Some(RepositoryConfig {
                trunk: Some("bad..name".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nested_data_file_rejected() {
        for bad in ["dir/data.db", "", "..", ".git"] {
            let repo = RepositoryConfig {
                data_file: Some(bad.into()),
                ..Default::default()
            };
            assert!(repo.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn half_identity_rejected() {
        let identity = IdentityConfig {
            name: Some("Ada".into()),
            email: None,
        };
        assert!(identity.validate().is_err());
    }

    #[test]
    fn bad_log_level_rejected() {
        let logging = LoggingConfig {
            level: Some("loud".into()),
            ..Default::default()
        };
        assert!(logging.validate().is_err());
    }
}
