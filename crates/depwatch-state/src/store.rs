//! StateStore — redb-backed persistence for depwatch.
//!
//! Implements [`DefinitionStore`] and [`ResultStore`] over five tables:
//! definitions, an id → key index, result history, latest result per
//! definition and id sequences. Result history is append-only; the latest table is kept in
//! step inside the same write transaction as each insert.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use tracing::{debug, info};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::traits::{DefinitionStore, ResultStore};
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        {
            let definitions = txn.open_table(DEFINITIONS).map_err(map_err!(Table))?;
            let mut ids = txn.open_table(DEFINITION_IDS).map_err(map_err!(Table))?;
            // Index any definition written before the id table existed.
            for entry in definitions.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let def: CheckDefinition =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if ids.get(def.id).map_err(map_err!(Read))?.is_none() {
                    ids.insert(def.id, key.value()).map_err(map_err!(Write))?;
                }
            }
        }
        txn.open_table(RESULTS).map_err(map_err!(Table))?;
        txn.open_table(LATEST_RESULTS).map_err(map_err!(Table))?;
        txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Definitions ────────────────────────────────────────────────

    /// Get a definition by its immutable key.
    pub fn get_definition_by_key(&self, key: &str) -> StateResult<Option<CheckDefinition>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEFINITIONS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let def: CheckDefinition =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(def))
            }
            None => Ok(None),
        }
    }

    /// Get a definition by numeric id.
    pub fn get_definition(&self, id: DefinitionId) -> StateResult<Option<CheckDefinition>> {
        let key = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let ids = txn.open_table(DEFINITION_IDS).map_err(map_err!(Table))?;
            match ids.get(id).map_err(map_err!(Read))? {
                Some(guard) => guard.value().to_string(),
                None => return Ok(None),
            }
        };
        self.get_definition_by_key(&key)
    }

    fn read_definitions(&self) -> StateResult<Vec<CheckDefinition>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEFINITIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let def: CheckDefinition =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(def);
        }
        Ok(results)
    }

    // ── Results ────────────────────────────────────────────────────

    /// Get the most recent result for a definition.
    pub fn get_latest_result(
        &self,
        definition_id: DefinitionId,
    ) -> StateResult<Option<CheckResult>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(LATEST_RESULTS).map_err(map_err!(Table))?;
        match table.get(definition_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let result: CheckResult =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// Recent results for a definition, newest first.
    pub fn list_history(
        &self,
        definition_id: DefinitionId,
        limit: usize,
    ) -> StateResult<Vec<CheckResult>> {
        let start = result_key(definition_id, 0);
        let end = result_key(definition_id, u64::MAX);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RESULTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table
            .range(start.as_str()..=end.as_str())
            .map_err(map_err!(Read))?
            .rev()
        {
            if results.len() >= limit {
                break;
            }
            let (_, value) = entry.map_err(map_err!(Read))?;
            let result: CheckResult =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(result);
        }
        Ok(results)
    }
}

/// Allocate the next id from a named sequence inside `txn`.
fn next_id(txn: &WriteTransaction, sequence: &str) -> StateResult<u64> {
    let mut table = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
    let current = table
        .get(sequence)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next).map_err(map_err!(Write))?;
    Ok(next)
}

fn sort_definitions(defs: &mut [CheckDefinition]) {
    defs.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.key.cmp(&b.key))
    });
}

impl DefinitionStore for StateStore {
    fn ensure_seeded(&self, seeds: &[DefinitionSeed]) -> StateResult<usize> {
        for seed in seeds {
            seed.validate().map_err(StateError::Invalid)?;
        }

        let now = Utc::now();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut inserted = 0;
        {
            let mut table = txn.open_table(DEFINITIONS).map_err(map_err!(Table))?;
            let mut ids = txn.open_table(DEFINITION_IDS).map_err(map_err!(Table))?;
            for seed in seeds {
                let exists = table
                    .get(seed.key.as_str())
                    .map_err(map_err!(Read))?
                    .is_some();
                if exists {
                    continue;
                }
                let id = next_id(&txn, DEFINITION_SEQ)?;
                let def = seed.clone().into_definition(id, now);
                let value = serde_json::to_vec(&def).map_err(map_err!(Serialize))?;
                table
                    .insert(def.key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
                ids.insert(id, def.key.as_str()).map_err(map_err!(Write))?;
                debug!(key = %def.key, id, "definition seeded");
                inserted += 1;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if inserted > 0 {
            info!(inserted, total = seeds.len(), "check definitions seeded");
        }
        Ok(inserted)
    }

    fn list_definitions(&self, include_disabled: bool) -> StateResult<Vec<CheckDefinition>> {
        let mut defs: Vec<CheckDefinition> = self
            .read_definitions()?
            .into_iter()
            .filter(|def| include_disabled || def.is_enabled)
            .collect();
        sort_definitions(&mut defs);
        Ok(defs)
    }

    fn list_latest(&self, include_disabled: bool) -> StateResult<Vec<LatestRow>> {
        let defs = self.list_definitions(include_disabled)?;
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(LATEST_RESULTS).map_err(map_err!(Table))?;
        let mut rows = Vec::with_capacity(defs.len());
        for definition in defs {
            let result = match table.get(definition.id).map_err(map_err!(Read))? {
                Some(guard) => Some(
                    serde_json::from_slice::<CheckResult>(guard.value())
                        .map_err(map_err!(Deserialize))?,
                ),
                None => None,
            };
            rows.push(LatestRow { definition, result });
        }
        Ok(rows)
    }

    fn update_definitions(&self, updates: &[DefinitionUpdate]) -> StateResult<usize> {
        for update in updates {
            update.validate().map_err(StateError::Invalid)?;
        }

        let now = Utc::now();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(DEFINITIONS).map_err(map_err!(Table))?;
            let mut existing = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (_, value) = entry.map_err(map_err!(Read))?;
                let def: CheckDefinition =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                existing.push(def);
            }

            for update in updates {
                // Returning before commit aborts the whole batch.
                let def = existing
                    .iter_mut()
                    .find(|def| def.id == update.id)
                    .ok_or_else(|| StateError::NotFound(format!("definition {}", update.id)))?;
                update.apply(def, now);
                let value = serde_json::to_vec(&*def).map_err(map_err!(Serialize))?;
                table
                    .insert(def.key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count = updates.len(), "definitions updated");
        Ok(updates.len())
    }
}

impl ResultStore for StateStore {
    fn insert_result(
        &self,
        definition_id: DefinitionId,
        checked_utc: DateTime<Utc>,
        outcome: &ProbeOutcome,
    ) -> StateResult<CheckResult> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let known = {
            let ids = txn.open_table(DEFINITION_IDS).map_err(map_err!(Table))?;
            ids.get(definition_id).map_err(map_err!(Read))?.is_some()
        };
        if !known {
            txn.abort().map_err(map_err!(Transaction))?;
            return Err(StateError::NotFound(format!("definition {definition_id}")));
        }
        let id = next_id(&txn, RESULT_SEQ)?;
        let result = CheckResult {
            id,
            definition_id,
            checked_utc,
            outcome: outcome.clone(),
        };
        let value = serde_json::to_vec(&result).map_err(map_err!(Serialize))?;
        {
            let mut history = txn.open_table(RESULTS).map_err(map_err!(Table))?;
            history
                .insert(result.table_key().as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        {
            let mut latest = txn.open_table(LATEST_RESULTS).map_err(map_err!(Table))?;
            let newer_exists = match latest.get(definition_id).map_err(map_err!(Read))? {
                Some(guard) => {
                    let current: CheckResult = serde_json::from_slice(guard.value())
                        .map_err(map_err!(Deserialize))?;
                    current.checked_utc > checked_utc
                }
                None => false,
            };
            if !newer_exists {
                latest
                    .insert(definition_id, value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            definition_id,
            result_id = id,
            status = result.outcome.status.as_str(),
            "result stored"
        );
        Ok(result)
    }
}
