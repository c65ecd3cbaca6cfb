//! YAML configuration for the groupmatch service.
//!
//! Every stage reads its section from one file. Sections and fields may be
//! omitted; anything missing falls back to its default.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "study-partners"
//!
//! ingest:
//!   max_difficulty: 3
//!   max_desired_size: 4
//!   queue_capacity: 100
//!   submit_timeout_ms: 250
//!
//! matcher:
//!   weights:
//!     size: 2
//!     difficulty: 3
//!     topics: 1
//!   match_threshold: 4.0
//!   compromise_factor: 2.0
//!   max_group_size: 4
//!
//! scheduler:
//!   timeout_threshold: 12
//!   tick_interval_ms: 15000
//!   max_drain_per_tick: 100
//!   release_full_groups: true
//!
//! logging:
//!   level: "info"
//!   json: true
//! ```
use std::fs;
use std::path::Path;
use std::time::Duration;

use ingest::{ConfigError, IngestConfig};
use matcher::{MatchConfig, MatchError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

impl From<ConfigError> for ConfigLoadError {
    fn from(err: ConfigError) -> Self {
        ConfigLoadError::Validation(format!("ingest: {err}"))
    }
}

impl From<MatchError> for ConfigLoadError {
    fn from(err: MatchError) -> Self {
        ConfigLoadError::Validation(format!("matcher: {err}"))
    }
}

/// Top-level configuration for the whole service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMatchConfig {
    /// Configuration format version. Only `"1.0"` (or `"1"`) is understood.
    pub version: String,

    /// Optional free-form deployment name, echoed in the startup log.
    pub name: Option<String>,

    pub ingest: IngestConfig,
    pub matcher: MatchConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

impl Default for GroupMatchConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestConfig::default(),
            matcher: MatchConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GroupMatchConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: GroupMatchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section. A failure here must keep the scheduler from
    /// starting.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        self.ingest.validate()?;
        self.matcher.validate()?;
        self.scheduler.validate()?;
        self.logging.validate()?;

        if self.ingest.max_desired_size as usize > self.matcher.max_group_size {
            return Err(ConfigLoadError::Validation(format!(
                "ingest.max_desired_size ({}) exceeds matcher.max_group_size ({})",
                self.ingest.max_desired_size, self.matcher.max_group_size
            )));
        }
        Ok(())
    }
}

/// Aging and cadence of the cycle driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Age, in cycles, at which a group is forced out of the pool.
    pub timeout_threshold: u32,
    /// Target spacing between tick starts.
    pub tick_interval_ms: u64,
    /// Upper bound on profiles admitted per tick; the rest wait for the
    /// next tick.
    pub max_drain_per_tick: usize,
    /// Let groups that reach `max_group_size` exit without waiting for the
    /// timeout.
    pub release_full_groups: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timeout_threshold: 12,
            tick_interval_ms: 15_000,
            max_drain_per_tick: 100,
            release_full_groups: true,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.timeout_threshold == 0 {
            return Err(ConfigLoadError::Validation(
                "scheduler.timeout_threshold must be greater than zero".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "scheduler.tick_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_drain_per_tick == 0 {
            return Err(ConfigLoadError::Validation(
                "scheduler.max_drain_per_tick must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Subscriber settings for the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `groupmatch=debug,matcher=trace`.
    /// `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "logging.level must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = GroupMatchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.scheduler.tick_interval(), Duration::from_secs(15));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg = GroupMatchConfig::from_yaml(
            r#"
version: "1.0"
matcher:
  match_threshold: 6.5
  weights:
    size: 6
    difficulty: 4
    topics: 1
scheduler:
  timeout_threshold: 8
"#,
        )
        .expect("valid yaml");

        assert_eq!(cfg.matcher.match_threshold, 6.5);
        assert_eq!(cfg.matcher.weights.get("size"), Some(6.0));
        assert_eq!(cfg.matcher.compromise_factor, 2.0);
        assert_eq!(cfg.scheduler.timeout_threshold, 8);
        assert_eq!(cfg.scheduler.tick_interval_ms, 15_000);
        assert_eq!(cfg.ingest.queue_capacity, 100);
        assert!(cfg.logging.json);
    }

    #[test]
    fn unsupported_version_rejected() {
        let err = GroupMatchConfig::from_yaml("version: \"2.0\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn missing_weight_rejected() {
        let err = GroupMatchConfig::from_yaml(
            r#"
matcher:
  weights:
    size: 2
    topics: 1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.contains("difficulty")));
    }

    #[test]
    fn zero_cadence_rejected() {
        let mut cfg = GroupMatchConfig::default();
        cfg.scheduler.timeout_threshold = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = GroupMatchConfig::default();
        cfg.scheduler.tick_interval_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = GroupMatchConfig::default();
        cfg.ingest.queue_capacity = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigLoadError::Validation(msg)) if msg.starts_with("ingest")
        ));
    }

    #[test]
    fn desired_size_cannot_exceed_group_cap() {
        let mut cfg = GroupMatchConfig::default();
        cfg.matcher.max_group_size = 3;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = GroupMatchConfig::from_yaml("matcher: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigLoadError::YamlParse(_)));
    }
}
