//! Typed configuration for the HEIMDALL monitor.
//!
//! Aggregates the per-subsystem configs into one schema with TOML loading.
//! Absent tables fall back to subsystem defaults; present tables must be
//! complete.

#![warn(missing_docs, clippy::pedantic)]

use std::path::Path;
use std::time::Duration;

use heimdall_alerts::{AlertError, AlertRule};
use heimdall_causal::{CausalConfig, CausalError};
use heimdall_drift::{DriftConfig, DriftError};
use heimdall_protocol::{ProtocolConfig, ProtocolError};
use heimdall_telemetry::{TelemetryError, WatchConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// Telemetry section was invalid.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Protocol section was invalid.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Causal section was invalid.
    #[error(transparent)]
    Causal(#[from] CausalError),
    /// Drift section was invalid.
    #[error(transparent)]
    Drift(#[from] DriftError),
    /// An alert rule was invalid.
    #[error(transparent)]
    Alert(#[from] AlertError),
    /// Top-level setting was invalid.
    #[error("invalid monitor configuration: {0}")]
    Invalid(&'static str),
}

fn default_snapshot_interval() -> Duration {
    Duration::from_secs(60)
}

/// Complete monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Telemetry watch settings.
    #[serde(default)]
    pub watch: WatchConfig,
    /// Breaker / quarantine / remediation settings.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Causal graph settings.
    #[serde(default)]
    pub causal: CausalConfig,
    /// A2A drift settings.
    #[serde(default)]
    pub drift: DriftConfig,
    /// Alert rules registered at startup.
    #[serde(default)]
    pub rules: Vec<AlertRule>,
    /// Interval between background state snapshots.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            protocol: ProtocolConfig::default(),
            causal: CausalConfig::default(),
            drift: DriftConfig::default(),
            rules: Vec::new(),
            snapshot_interval: default_snapshot_interval(),
        }
    }
}

impl MonitorConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first sub-section validation failure encountered.
    pub fn validate(&self) -> ConfigResult<()> {
        self.watch.validate()?;
        self.protocol.validate()?;
        self.causal.validate()?;
        self.drift.validate()?;
        for rule in &self.rules {
            rule.validate()?;
        }
        if self.snapshot_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "snapshot interval must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns parse or validation failures.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns I/O, parse, or validation failures.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        MonitorConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(config.watch, WatchConfig::default());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn parses_rules_and_sections() {
        let config = MonitorConfig::from_toml_str(
            r#"
            snapshot_interval = { secs = 30, nanos = 0 }

            [protocol]
            remediation_capacity = 64

            [protocol.breaker]
            failure_threshold = 3
            success_threshold = 1
            open_timeout = { secs = 15, nanos = 0 }

            [[rules]]
            id = "error-wave"
            name = "Error wave"
            severity = "critical"
            cooldown = { secs = 300, nanos = 0 }

            [rules.condition]
            kind = "cascade"
            min_agents = 2
            outcome = "error"
            "#,
        )
        .unwrap();

        assert_eq!(config.snapshot_interval, Duration::from_secs(30));
        assert_eq!(config.protocol.breaker.failure_threshold, 3);
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].id(), "error-wave");
    }

    #[test]
    fn invalid_rule_fails_validation() {
        let err = MonitorConfig::from_toml_str(
            r#"
            [[rules]]
            id = ""
            name = "nameless"
            severity = "info"
            cooldown = { secs = 1, nanos = 0 }

            [rules.condition]
            kind = "cascade"
            min_agents = 1
            outcome = "error"
            "#,
        );
        assert!(matches!(err, Err(ConfigError::Alert(_))));
    }

    #[test]
    fn zero_snapshot_interval_is_rejected() {
        let mut config = MonitorConfig::default();
        config.snapshot_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
