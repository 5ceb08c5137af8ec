//! In-process [`SearchEngine`] for tests and dry runs
//!
//! Keeps indices, aliases and documents in a mutex-guarded map. Bulk writes
//! upsert by id, so replaying a document replaces it. Failure switches let
//! callers exercise the error paths of the importer.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::engine::{BulkOperation, BulkResponse, EngineError, SearchEngine};

/// A recorded bulk request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCall {
    pub index: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryIndex {
    body: Value,
    aliases: BTreeSet<String>,
    documents: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct MemoryState {
    indices: BTreeMap<String, MemoryIndex>,
    bulk_calls: Vec<BulkCall>,
    fail_bulk: bool,
    fail_create: bool,
}

/// Search engine held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<MemoryState>,
}

fn not_found(index: &str) -> EngineError {
    EngineError::status(404, format!("no such index [{index}]"))
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an index directly, bypassing failure switches.
    pub fn seed_index(&self, index: &str, aliases: &[&str]) {
        let mut state = self.state();
        let entry = state.indices.entry(index.to_string()).or_default();
        entry
            .aliases
            .extend(aliases.iter().map(|alias| alias.to_string()));
    }

    /// Make every subsequent bulk request fail as a whole.
    pub fn set_fail_bulk(&self, fail: bool) {
        self.state().fail_bulk = fail;
    }

    /// Make every subsequent index creation fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.state().fail_create = fail;
    }

    /// Names of all indices, sorted.
    pub fn index_names(&self) -> Vec<String> {
        self.state().indices.keys().cloned().collect()
    }

    /// Aliases currently pointing at `index`.
    pub fn aliases_of(&self, index: &str) -> Vec<String> {
        self.state()
            .indices
            .get(index)
            .map(|entry| entry.aliases.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Documents stored in `index`, keyed by id.
    pub fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        self.state()
            .indices
            .get(index)
            .map(|entry| entry.documents.clone())
            .unwrap_or_default()
    }

    /// Settings/mappings body the index was created with.
    pub fn index_body(&self, index: &str) -> Option<Value> {
        self.state()
            .indices
            .get(index)
            .map(|entry| entry.body.clone())
    }

    /// Every bulk request received so far, in order.
    pub fn bulk_calls(&self) -> Vec<BulkCall> {
        self.state().bulk_calls.clone()
    }
}

impl SearchEngine for MemoryEngine {
    fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        Ok(self.state().indices.contains_key(index))
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError> {
        let mut state = self.state();
        if state.fail_create {
            return Err(EngineError::status(500, "index creation disabled"));
        }
        if state.indices.contains_key(index) {
            return Err(EngineError::status(
                400,
                format!("index [{index}] already exists"),
            ));
        }
        state.indices.insert(
            index.to_string(),
            MemoryIndex {
                body: body.clone(),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        self.state()
            .indices
            .remove(index)
            .map(drop)
            .ok_or_else(|| not_found(index))
    }

    fn alias_exists(&self, alias: &str) -> Result<bool, EngineError> {
        Ok(self
            .state()
            .indices
            .values()
            .any(|entry| entry.aliases.contains(alias)))
    }

    fn get_alias(&self, alias: &str) -> Result<Vec<String>, EngineError> {
        Ok(self
            .state()
            .indices
            .iter()
            .filter(|(_, entry)| entry.aliases.contains(alias))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn put_alias(&self, index: &str, alias: &str) -> Result<(), EngineError> {
        let mut state = self.state();
        let entry = state.indices.get_mut(index).ok_or_else(|| not_found(index))?;
        entry.aliases.insert(alias.to_string());
        Ok(())
    }

    fn delete_alias(&self, index: &str, alias: &str) -> Result<(), EngineError> {
        let mut state = self.state();
        let entry = state.indices.get_mut(index).ok_or_else(|| not_found(index))?;
        if entry.aliases.remove(alias) {
            Ok(())
        } else {
            Err(EngineError::status(
                404,
                format!("alias [{alias}] missing on [{index}]"),
            ))
        }
    }

    fn list_indices(&self, prefix: &str) -> Result<BTreeMap<String, Vec<String>>, EngineError> {
        Ok(self
            .state()
            .indices
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, entry)| (name.clone(), entry.aliases.iter().cloned().collect()))
            .collect())
    }

    fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, EngineError> {
        let mut state = self.state();
        state.bulk_calls.push(BulkCall {
            index: index.to_string(),
            ids: operations.iter().map(|op| op.id.clone()).collect(),
        });
        if state.fail_bulk {
            return Err(EngineError::status(503, "bulk rejected"));
        }
        let entry = state.indices.get_mut(index).ok_or_else(|| not_found(index))?;
        for op in operations {
            entry.documents.insert(op.id.clone(), op.source.clone());
        }
        Ok(BulkResponse {
            items: operations.len(),
            ..Default::default()
        })
    }
}
