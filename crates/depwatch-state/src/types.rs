//! Domain types for the depwatch state store.
//!
//! These types represent persisted check definitions and probe results,
//! plus the `LatestRow` read model the dashboard and snapshot cache work
//! with. All types are serializable to/from JSON for storage in redb tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depwatch_core::limits;

/// Numeric identifier of a check definition.
pub type DefinitionId = u64;

/// Numeric identifier of a stored result.
pub type ResultId = u64;

// ── Status ────────────────────────────────────────────────────────

/// Classified outcome of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    #[default]
    Unknown,
    Up,
    Degraded,
    Down,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Unknown => "unknown",
            CheckStatus::Up => "up",
            CheckStatus::Degraded => "degraded",
            CheckStatus::Down => "down",
        }
    }
}

// ── Definitions ───────────────────────────────────────────────────

/// Persisted configuration for one monitored dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckDefinition {
    pub id: DefinitionId,
    /// Unique, case-sensitive and immutable once seeded.
    pub key: String,
    pub display_name: String,
    pub category: String,
    pub is_enabled: bool,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    /// Latency above which an `Up` probe is reported as `Degraded`.
    pub degraded_threshold_ms: Option<u32>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Seed data for a definition. Only inserted when no row with `key` exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefinitionSeed {
    pub key: String,
    pub display_name: String,
    pub category: String,
    pub is_enabled: bool,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    pub degraded_threshold_ms: Option<u32>,
}

/// Operator-editable settings for an existing definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefinitionUpdate {
    pub id: DefinitionId,
    pub is_enabled: bool,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    pub degraded_threshold_ms: Option<u32>,
}

impl DefinitionSeed {
    /// Check the seed against field limits and tunable ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.key.trim().is_empty() {
            return Err("key must not be empty".to_string());
        }
        if self.key.chars().count() > limits::KEY_MAX_LEN {
            return Err(format!("key '{}' is too long", self.key));
        }
        if self.display_name.chars().count() > limits::DISPLAY_NAME_MAX_LEN {
            return Err(format!("display name for '{}' is too long", self.key));
        }
        if self.category.chars().count() > limits::CATEGORY_MAX_LEN {
            return Err(format!("category for '{}' is too long", self.key));
        }
        validate_tunables(
            self.interval_seconds,
            self.timeout_seconds,
            self.degraded_threshold_ms,
        )
    }

    /// Materialize a new definition row.
    pub fn into_definition(self, id: DefinitionId, now: DateTime<Utc>) -> CheckDefinition {
        CheckDefinition {
            id,
            key: self.key,
            display_name: self.display_name,
            category: self.category,
            is_enabled: self.is_enabled,
            interval_seconds: self.interval_seconds,
            timeout_seconds: self.timeout_seconds,
            degraded_threshold_ms: self.degraded_threshold_ms,
            created_utc: now,
            updated_utc: now,
        }
    }
}

impl DefinitionUpdate {
    pub fn validate(&self) -> Result<(), String> {
        validate_tunables(
            self.interval_seconds,
            self.timeout_seconds,
            self.degraded_threshold_ms,
        )
    }

    /// Apply the tunables to `def`, leaving identity fields untouched.
    pub fn apply(&self, def: &mut CheckDefinition, now: DateTime<Utc>) {
        def.is_enabled = self.is_enabled;
        def.interval_seconds = self.interval_seconds;
        def.timeout_seconds = self.timeout_seconds;
        def.degraded_threshold_ms = self.degraded_threshold_ms;
        def.updated_utc = now;
    }
}

fn validate_tunables(
    interval_seconds: u32,
    timeout_seconds: u32,
    degraded_threshold_ms: Option<u32>,
) -> Result<(), String> {
    if !limits::INTERVAL_SECONDS.contains(&interval_seconds) {
        return Err(format!("interval_seconds {interval_seconds} out of range"));
    }
    if !limits::TIMEOUT_SECONDS.contains(&timeout_seconds) {
        return Err(format!("timeout_seconds {timeout_seconds} out of range"));
    }
    if let Some(ms) = degraded_threshold_ms {
        if !limits::DEGRADED_THRESHOLD_MS.contains(&ms) {
            return Err(format!("degraded_threshold_ms {ms} out of range"));
        }
    }
    Ok(())
}

// ── Results ───────────────────────────────────────────────────────

/// What a single probe execution produced, before it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProbeOutcome {
    pub status: CheckStatus,
    pub latency_ms: Option<u64>,
    pub message: Option<String>,
    /// Opaque JSON payload.
    pub details_json: Option<String>,
    pub http_status_code: Option<u16>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    /// A healthy outcome with no latency measurement.
    pub fn up() -> Self {
        Self {
            status: CheckStatus::Up,
            ..Default::default()
        }
    }

    /// A failed outcome carrying an error classification.
    pub fn down(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Down,
            error_type: Some(error_type.into()),
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_http_status(mut self, code: u16) -> Self {
        self.http_status_code = Some(code);
        self
    }

    pub fn with_details_json(mut self, details: impl Into<String>) -> Self {
        self.details_json = Some(details.into());
        self
    }
}

/// An immutable, persisted probe result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub id: ResultId,
    pub definition_id: DefinitionId,
    pub checked_utc: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl CheckResult {
    /// Build the composite key for the results table.
    pub fn table_key(&self) -> String {
        result_key(self.definition_id, self.id)
    }
}

/// Composite history key; zero-padding keeps lexical order numeric.
pub fn result_key(definition_id: DefinitionId, result_id: ResultId) -> String {
    format!("{definition_id:020}:{result_id:020}")
}

// ── Read model ────────────────────────────────────────────────────

/// A definition joined with its most recent result, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestRow {
    pub definition: CheckDefinition,
    pub result: Option<CheckResult>,
}

impl LatestRow {
    /// When the definition was last probed.
    pub fn last_checked_utc(&self) -> Option<DateTime<Utc>> {
        self.result.as_ref().map(|r| r.checked_utc)
    }

    /// Latest status, `Unknown` if never checked.
    pub fn status(&self) -> CheckStatus {
        self.result
            .as_ref()
            .map(|r| r.outcome.status)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(key: &str) -> DefinitionSeed {
        DefinitionSeed {
            key: key.to_string(),
            display_name: "GitHub".to_string(),
            category: "Source control".to_string(),
            is_enabled: true,
            interval_seconds: 60,
            timeout_seconds: 10,
            degraded_threshold_ms: Some(500),
        }
    }

    #[test]
    fn seed_validation_accepts_defaults() {
        assert!(seed("github").validate().is_ok());
    }

    #[test]
    fn seed_validation_rejects_long_key() {
        let s = seed(&"k".repeat(101));
        assert!(s.validate().is_err());
    }

    #[test]
    fn update_validation_rejects_out_of_range() {
        let update = DefinitionUpdate {
            id: 1,
            is_enabled: true,
            interval_seconds: 4,
            timeout_seconds: 10,
            degraded_threshold_ms: None,
        };
        assert!(update.validate().is_err());

        let update = DefinitionUpdate {
            timeout_seconds: 121,
            interval_seconds: 60,
            ..update
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn update_apply_keeps_identity() {
        let now = Utc::now();
        let mut def = seed("github").into_definition(7, now);
        let update = DefinitionUpdate {
            id: 7,
            is_enabled: false,
            interval_seconds: 600,
            timeout_seconds: 30,
            degraded_threshold_ms: None,
        };
        update.apply(&mut def, now);
        assert_eq!(def.key, "github");
        assert_eq!(def.id, 7);
        assert!(!def.is_enabled);
        assert_eq!(def.interval_seconds, 600);
        assert_eq!(def.degraded_threshold_ms, None);
    }

    #[test]
    fn result_keys_sort_numerically() {
        assert!(result_key(1, 9) < result_key(1, 10));
        assert!(result_key(1, 999) < result_key(2, 1));
    }

    #[test]
    fn check_result_flattens_outcome() {
        let result = CheckResult {
            id: 1,
            definition_id: 2,
            checked_utc: Utc::now(),
            outcome: ProbeOutcome::up().with_latency_ms(42),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "up");
        assert_eq!(json["latency_ms"], 42);
        let back: CheckResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn latest_row_without_result_is_unknown() {
        let row = LatestRow {
            definition: seed("a").into_definition(1, Utc::now()),
            result: None,
        };
        assert_eq!(row.status(), CheckStatus::Unknown);
        assert!(row.last_checked_utc().is_none());
    }
}
