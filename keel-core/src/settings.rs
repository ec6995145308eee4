//! Reconcile settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.keel/
//!   config.yaml     (optional; every field has a default)
//!   state/
//!     <project>.json
//! ```
//!
//! # API pattern
//!
//! Every loader has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 10;
pub const DEFAULT_MUTATE_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_DELETE_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Tunables for the retry governor and the remote mutex guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Total attempts per mutation, first call included.
    pub retry_attempts: u32,
    /// Wait between attempts for add and update calls.
    pub mutate_interval_secs: u64,
    /// Wait between attempts for delete calls.
    pub delete_interval_secs: u64,
    /// Wait between last-action status polls.
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            mutate_interval_secs: DEFAULT_MUTATE_INTERVAL_SECS,
            delete_interval_secs: DEFAULT_DELETE_INTERVAL_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl Settings {
    pub fn mutate_interval(&self) -> Duration {
        Duration::from_secs(self.mutate_interval_secs)
    }

    pub fn delete_interval(&self) -> Duration {
        Duration::from_secs(self.delete_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// `<home>/.keel`, pure, no I/O.
pub fn keel_root(home: &Path) -> PathBuf {
    home.join(".keel")
}

/// `<home>/.keel/config.yaml`, pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    keel_root(home).join("config.yaml")
}

/// Load settings from `<home>/.keel/config.yaml`.
///
/// Returns defaults when the file does not exist. Missing keys take their
/// defaults; a malformed file is a `ConfigError::Parse`.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(&home()?)
}

/// Resolve the current user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_config_missing() {
        let home = TempDir::new().unwrap();
        let settings = load_at(home.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retry_attempts, 10);
        assert_eq!(settings.mutate_interval(), Duration::from_secs(15));
        assert_eq!(settings.delete_interval(), Duration::from_secs(20));
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let home = TempDir::new().unwrap();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "retry_attempts: 3\npoll_interval_secs: 1\n").unwrap();

        let settings = load_at(home.path()).unwrap();
        assert_eq!(settings.retry_attempts, 3);
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.delete_interval_secs, DEFAULT_DELETE_INTERVAL_SECS);
    }

    #[test]
    fn empty_config_is_default() {
        let home = TempDir::new().unwrap();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load_at(home.path()).unwrap(), Settings::default());
    }
}
