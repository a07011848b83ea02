//! depwatch.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limits;

/// Errors raised while loading or validating `depwatch.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [monitor] setting: {0}")]
    InvalidMonitor(String),

    #[error("invalid check '{key}': {reason}")]
    InvalidCheck { key: String, reason: String },

    #[error("duplicate check key: {0}")]
    DuplicateKey(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepwatchConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    #[serde(default = "default_cooldown_seconds")]
    pub refresh_cooldown_seconds: u64,
    #[serde(default = "default_max_parallel")]
    pub max_parallel_probes: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            refresh_cooldown_seconds: default_cooldown_seconds(),
            max_parallel_probes: default_max_parallel(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// One monitored dependency: seed definition plus the HTTP target to probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub key: String,
    pub display_name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
    pub degraded_threshold_ms: Option<u32>,
}

fn default_tick_seconds() -> u64 {
    30
}

fn default_cooldown_seconds() -> u64 {
    30
}

fn default_max_parallel() -> usize {
    4
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_category() -> String {
    "General".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_interval_seconds() -> u32 {
    300
}

fn default_timeout_seconds() -> u32 {
    10
}

impl DepwatchConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DepwatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate keys and out-of-range tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()?;
        let mut seen = HashSet::new();
        for check in &self.checks {
            check.validate()?;
            if !seen.insert(check.key.as_str()) {
                return Err(ConfigError::DuplicateKey(check.key.clone()));
            }
        }
        Ok(())
    }
}

impl MonitorConfig {
    /// Every tunable must be non-zero; a zero tick would spin the loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_seconds == 0 {
            return Err(ConfigError::InvalidMonitor("tick_seconds must be > 0".into()));
        }
        if self.refresh_cooldown_seconds == 0 {
            return Err(ConfigError::InvalidMonitor(
                "refresh_cooldown_seconds must be > 0".into(),
            ));
        }
        if self.max_parallel_probes == 0 {
            return Err(ConfigError::InvalidMonitor(
                "max_parallel_probes must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidCheck {
            key: self.key.clone(),
            reason,
        };

        if self.key.trim().is_empty() {
            return Err(invalid("key must not be empty".to_string()));
        }
        if self.key.chars().count() > limits::KEY_MAX_LEN {
            return Err(invalid(format!("key longer than {}", limits::KEY_MAX_LEN)));
        }
        if self.display_name.chars().count() > limits::DISPLAY_NAME_MAX_LEN {
            return Err(invalid(format!(
                "display_name longer than {}",
                limits::DISPLAY_NAME_MAX_LEN
            )));
        }
        if self.category.chars().count() > limits::CATEGORY_MAX_LEN {
            return Err(invalid(format!(
                "category longer than {}",
                limits::CATEGORY_MAX_LEN
            )));
        }
        if self.url.trim().is_empty() {
            return Err(invalid("url must not be empty".to_string()));
        }
        if !limits::INTERVAL_SECONDS.contains(&self.interval_seconds) {
            return Err(invalid(format!(
                "interval_seconds {} outside {:?}",
                self.interval_seconds,
                limits::INTERVAL_SECONDS
            )));
        }
        if !limits::TIMEOUT_SECONDS.contains(&self.timeout_seconds) {
            return Err(invalid(format!(
                "timeout_seconds {} outside {:?}",
                self.timeout_seconds,
                limits::TIMEOUT_SECONDS
            )));
        }
        if let Some(ms) = self.degraded_threshold_ms {
            if !limits::DEGRADED_THRESHOLD_MS.contains(&ms) {
                return Err(invalid(format!(
                    "degraded_threshold_ms {ms} outside {:?}",
                    limits::DEGRADED_THRESHOLD_MS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[monitor]
tick_seconds = 15

[[checks]]
key = "github"
display_name = "GitHub API"
category = "Source control"
url = "https://api.github.com/"
degraded_threshold_ms = 1500

[[checks]]
key = "stripe"
display_name = "Stripe"
url = "https://api.stripe.com/healthcheck"
enabled = false
interval_seconds = 60
"#;

    #[test]
    fn parse_full_config() {
        let config = DepwatchConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.monitor.tick_seconds, 15);
        assert_eq!(config.monitor.refresh_cooldown_seconds, 30);
        assert_eq!(config.api.listen, "0.0.0.0:8080");
        assert_eq!(config.checks.len(), 2);

        let stripe = &config.checks[1];
        assert!(!stripe.enabled);
        assert_eq!(stripe.category, "General");
        assert_eq!(stripe.timeout_seconds, 10);
        assert_eq!(stripe.degraded_threshold_ms, None);
    }

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = DepwatchConfig::from_toml_str("").unwrap();
        assert_eq!(config.monitor.tick_seconds, 30);
        assert_eq!(config.monitor.max_parallel_probes, 4);
        assert!(config.checks.is_empty());
    }

    #[test]
    fn rejects_duplicate_keys() {
        let toml_str = r#"
[[checks]]
key = "a"
display_name = "A"
url = "http://a"

[[checks]]
key = "a"
display_name = "A again"
url = "http://a2"
"#;
        let err = DepwatchConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateKey(k) if k == "a"));
    }

    #[test]
    fn rejects_out_of_range_interval() {
        let toml_str = r#"
[[checks]]
key = "a"
display_name = "A"
url = "http://a"
interval_seconds = 2
"#;
        let err = DepwatchConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCheck { .. }));
    }

    #[test]
    fn rejects_zero_threshold() {
        let toml_str = r#"
[[checks]]
key = "a"
display_name = "A"
url = "http://a"
degraded_threshold_ms = 0
"#;
        assert!(DepwatchConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn rejects_zero_monitor_settings() {
        for (setting, name) in [
            ("tick_seconds = 0", "tick_seconds"),
            ("refresh_cooldown_seconds = 0", "refresh_cooldown_seconds"),
            ("max_parallel_probes = 0", "max_parallel_probes"),
        ] {
            let err = DepwatchConfig::from_toml_str(&format!("[monitor]\n{setting}\n"))
                .unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidMonitor(msg) if msg.contains(name)),
                "{setting}: {err}"
            );
        }
    }

    #[test]
    fn accepts_minimal_monitor_settings() {
        let config = DepwatchConfig::from_toml_str(
            "[monitor]\ntick_seconds = 1\nrefresh_cooldown_seconds = 1\nmax_parallel_probes = 1\n",
        )
        .unwrap();
        assert_eq!(config.monitor.max_parallel_probes, 1);
    }
}
