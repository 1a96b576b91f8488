//! Application configuration, loaded from a TOML file
//!
//! ```toml
//! database_path = "/home/me/.local/share/kotoba/kotoba.db"
//!
//! [scheduler]
//! learning_steps_secs = [60, 600]
//! relearning_steps_secs = [600]
//! maximum_interval_days = 36500
//!
//! [review_guard]
//! window_ms = 1500
//! max_entries = 10000
//!
//! [recompute]
//! page_size = 200
//! max_page_size = 1000
//! ```
//!
//! Every key is optional; a missing file means all defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for `maximum_interval_days`, keeps due dates representable
pub const MAX_INTERVAL_CEILING_DAYS: u32 = 365_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub review_guard: GuardConfig,
    #[serde(default)]
    pub recompute: RecomputeConfig,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("kotoba"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kotoba.db")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            scheduler: SchedulerConfig::default(),
            review_guard: GuardConfig::default(),
            recompute: RecomputeConfig::default(),
        }
    }
}

/// Learning-phase steps and interval bounds for the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_learning_steps")]
    pub learning_steps_secs: Vec<u32>,
    #[serde(default = "default_relearning_steps")]
    pub relearning_steps_secs: Vec<u32>,
    #[serde(default = "default_maximum_interval_days")]
    pub maximum_interval_days: u32,
}

fn default_learning_steps() -> Vec<u32> {
    vec![60, 600]
}

fn default_relearning_steps() -> Vec<u32> {
    vec![600]
}

fn default_maximum_interval_days() -> u32 {
    36_500
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps_secs: default_learning_steps(),
            relearning_steps_secs: default_relearning_steps(),
            maximum_interval_days: default_maximum_interval_days(),
        }
    }
}

impl SchedulerConfig {
    pub fn learning_steps(&self) -> Vec<Duration> {
        to_durations(&self.learning_steps_secs)
    }

    pub fn relearning_steps(&self) -> Vec<Duration> {
        to_durations(&self.relearning_steps_secs)
    }
}

fn to_durations(secs: &[u32]) -> Vec<Duration> {
    secs.iter().map(|s| Duration::seconds(i64::from(*s))).collect()
}

/// Debounce window for duplicate review submissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_window_ms() -> u64 {
    1_500
}

fn default_max_entries() -> u64 {
    10_000
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_entries: default_max_entries(),
        }
    }
}

impl GuardConfig {
    pub fn window(&self) -> StdDuration {
        StdDuration::from_millis(self.window_ms)
    }
}

/// Paging for history replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_page_size() -> usize {
    200
}

fn default_max_page_size() -> usize {
    1_000
}

impl Default for RecomputeConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl AppConfig {
    /// Default location: `<config_dir>/kotoba/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("kotoba").join("config.toml"))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Load and validate a config file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let sched = &self.scheduler;
        if sched.learning_steps_secs.iter().any(|s| *s == 0) {
            return Err(invalid("scheduler.learning_steps_secs", "steps must be at least 1 second"));
        }
        if sched.relearning_steps_secs.iter().any(|s| *s == 0) {
            return Err(invalid("scheduler.relearning_steps_secs", "steps must be at least 1 second"));
        }
        if sched.maximum_interval_days == 0 || sched.maximum_interval_days > MAX_INTERVAL_CEILING_DAYS {
            return Err(invalid(
                "scheduler.maximum_interval_days",
                format!("must be between 1 and {}", MAX_INTERVAL_CEILING_DAYS),
            ));
        }
        if self.review_guard.window_ms == 0 {
            return Err(invalid("review_guard.window_ms", "must be positive"));
        }
        if self.review_guard.max_entries == 0 {
            return Err(invalid("review_guard.max_entries", "must be positive"));
        }
        if self.recompute.page_size == 0 || self.recompute.max_page_size == 0 {
            return Err(invalid("recompute.page_size", "page sizes must be positive"));
        }
        if self.recompute.page_size > self.recompute.max_page_size {
            return Err(invalid("recompute.page_size", "exceeds recompute.max_page_size"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.scheduler.learning_steps_secs, vec![60, 600]);
        assert_eq!(config.scheduler.relearning_steps_secs, vec![600]);
        assert_eq!(config.review_guard.window_ms, 1_500);
        assert_eq!(config.recompute.page_size, 200);
    }

    #[test]
    fn test_partial_override() {
        let config = AppConfig::from_toml(
            r#"
            database_path = "/tmp/cards.db"

            [scheduler]
            learning_steps_secs = [30]

            [review_guard]
            window_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/cards.db"));
        assert_eq!(config.scheduler.learning_steps(), vec![Duration::seconds(30)]);
        assert_eq!(config.scheduler.relearning_steps_secs, vec![600]);
        assert_eq!(config.review_guard.window(), StdDuration::from_millis(500));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            AppConfig::from_toml("[scheduler]\nlearning_steps_secs = [0]"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AppConfig::from_toml("[recompute]\npage_size = 5000"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AppConfig::from_toml("[review_guard]\nwindow_ms = 0"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AppConfig::from_toml("scheduler = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[recompute]\npage_size = 10\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.recompute.page_size, 10);
        assert_eq!(config.recompute.max_page_size, 1_000);
    }
}
