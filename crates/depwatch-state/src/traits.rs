//! Storage seams consumed by the monitor engine.

use chrono::{DateTime, Utc};

use crate::error::StateResult;
use crate::types::*;

/// Durable check definitions plus the latest-result read path.
pub trait DefinitionStore: Send + Sync {
    /// Insert each seed whose key has no row yet. Existing rows are never
    /// touched. Returns the number of definitions inserted.
    fn ensure_seeded(&self, seeds: &[DefinitionSeed]) -> StateResult<usize>;

    /// List definitions ordered by category, display name and key.
    fn list_definitions(&self, include_disabled: bool) -> StateResult<Vec<CheckDefinition>>;

    /// Outer join of definitions with their most recent result.
    fn list_latest(&self, include_disabled: bool) -> StateResult<Vec<LatestRow>>;

    /// Apply a batch of tunable updates atomically. Returns the number updated.
    fn update_definitions(&self, updates: &[DefinitionUpdate]) -> StateResult<usize>;
}

/// Append-only probe history.
pub trait ResultStore: Send + Sync {
    fn insert_result(
        &self,
        definition_id: DefinitionId,
        checked_utc: DateTime<Utc>,
        outcome: &ProbeOutcome,
    ) -> StateResult<CheckResult>;
}
