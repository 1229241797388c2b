//! Handler configuration.
//!
//! Defaults match the device image layout; a JSON config file and a
//! small set of environment variables can override them per device.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment override for the work directory.
pub const ENV_WORK_DIR: &str = "FSUP_WORK_DIR";
/// Environment override for the shell-wrapper path.
pub const ENV_SHELL_PATH: &str = "FSUP_SHELL_PATH";
/// Environment override for the sentinel poll interval.
pub const ENV_POLL_INTERVAL_MS: &str = "FSUP_POLL_INTERVAL_MS";

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Step-handler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Rendezvous directory shared with the out-of-band controller.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Path to the setuid shell wrapper that fronts the updater CLI.
    #[serde(default = "default_shell_path")]
    pub shell_path: PathBuf,
    /// Sentinel poll interval in milliseconds. 100 ms is the upper
    /// bound on the latency the host tolerates.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Mode bits of the work directory; the controller account must
    /// be able to create sentinels in it.
    #[serde(default = "default_work_dir_mode")]
    pub work_dir_mode: u32,
    /// Mode bits of each stamp file (world-readable).
    #[serde(default = "default_stamp_mode")]
    pub stamp_mode: u32,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            shell_path: default_shell_path(),
            poll_interval_ms: default_poll_interval_ms(),
            work_dir_mode: default_work_dir_mode(),
            stamp_mode: default_stamp_mode(),
        }
    }
}

impl HandlerConfig {
    /// Loads configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the default configuration with environment overrides
    /// applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment overrides to an existing configuration.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(ENV_WORK_DIR) {
            if !dir.is_empty() {
                self.work_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var(ENV_SHELL_PATH) {
            if !path.is_empty() {
                self.shell_path = PathBuf::from(path);
            }
        }
        if let Ok(interval) = std::env::var(ENV_POLL_INTERVAL_MS) {
            if let Ok(ms) = interval.parse::<u64>() {
                self.poll_interval_ms = ms.max(1);
            }
        }
        self
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("/tmp/adu/.work")
}

fn default_shell_path() -> PathBuf {
    PathBuf::from("/usr/lib/adu/adu-shell")
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_work_dir_mode() -> u32 {
    0o777
}

fn default_stamp_mode() -> u32 {
    0o644
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_device_layout() {
        let config = HandlerConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/adu/.work"));
        assert_eq!(config.shell_path, PathBuf::from("/usr/lib/adu/adu-shell"));
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.work_dir_mode, 0o777);
        assert_eq!(config.stamp_mode, 0o644);
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"work_dir": "/var/lib/fsup/.work"}}"#).unwrap();

        let config = HandlerConfig::load(file.path()).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/var/lib/fsup/.work"));
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn malformed_config_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "work_dir = nope").unwrap();

        assert!(matches!(
            HandlerConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        assert!(matches!(
            HandlerConfig::load(Path::new("/nonexistent/fsup.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
