//! redb table definitions for the depwatch state store.

use redb::TableDefinition;

/// Check definitions keyed by their immutable `key`.
pub const DEFINITIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("definitions");

/// Definition id → key, written alongside every seeded definition.
pub const DEFINITION_IDS: TableDefinition<u64, &str> = TableDefinition::new("definition_ids");

/// Append-only result history keyed by `{definition_id:020}:{result_id:020}`.
pub const RESULTS: TableDefinition<&str, &[u8]> = TableDefinition::new("results");

/// Most recent result per definition, keyed by definition id.
pub const LATEST_RESULTS: TableDefinition<u64, &[u8]> = TableDefinition::new("latest_results");

/// Monotonic id counters keyed by sequence name.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Sequence name for definition ids.
pub const DEFINITION_SEQ: &str = "definitions";

/// Sequence name for result ids.
pub const RESULT_SEQ: &str = "results";
