//! Index generations behind a stable alias
//!
//! Each run writes into a fresh generation named
//! `<alias>_<YYYYMMDD>_<ordinal>`. Readers keep using the alias, which is only
//! moved once the run has succeeded; alias-less generations are deleted
//! afterwards.
//!
//! ```text
//! ensure_index ──► begin ──► (import) ──► commit ──► cleanup
//!                    │                       │
//!                    └──── dropped/failed ───┴──► discard ──► cleanup
//! ```

use chrono::NaiveDate;
use serde_json::Value;

use crate::engine::{AliasAction, EngineError, SearchEngine};

/// `<alias>_<YYYYMMDD>_`
fn generation_prefix(alias: &str, date: NaiveDate) -> String {
    format!("{alias}_{}_", date.format("%Y%m%d"))
}

/// Full generation name, e.g. `nocake_20240101_3`
pub fn generation_name(alias: &str, date: NaiveDate, ordinal: u32) -> String {
    format!("{}{ordinal}", generation_prefix(alias, date))
}

/// Smallest positive ordinal not used by any of `existing` under `prefix`.
///
/// Names that do not carry `prefix` followed by a plain number are ignored.
pub fn next_ordinal<'a>(existing: impl IntoIterator<Item = &'a str>, prefix: &str) -> u32 {
    let mut used: Vec<u32> = existing
        .into_iter()
        .filter_map(|name| name.strip_prefix(prefix))
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse().ok())
        .collect();
    used.sort_unstable();
    used.dedup();

    let mut ordinal = 1;
    for n in used {
        if n == ordinal {
            ordinal += 1;
        } else if n > ordinal {
            break;
        }
    }
    ordinal
}

/// Creates, publishes and garbage-collects index generations for one alias.
pub struct IndexLifecycle<'e, E: SearchEngine + ?Sized> {
    engine: &'e E,
    alias: String,
    date: NaiveDate,
    index_name: Option<String>,
}

impl<'e, E: SearchEngine + ?Sized> IndexLifecycle<'e, E> {
    pub fn new(engine: &'e E, alias: &str, date: NaiveDate) -> Self {
        Self {
            engine,
            alias: alias.to_string(),
            date,
            index_name: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Name of this run's generation, computed on first use and cached.
    pub fn index_name(&mut self) -> Result<String, EngineError> {
        if let Some(name) = &self.index_name {
            return Ok(name.clone());
        }
        let prefix = generation_prefix(&self.alias, self.date);
        let existing = self.engine.list_indices(&prefix)?;
        let ordinal = next_ordinal(existing.keys().map(String::as_str), &prefix);
        let name = format!("{prefix}{ordinal}");
        self.index_name = Some(name.clone());
        Ok(name)
    }

    /// Make sure this run's generation exists, creating it with `body`.
    ///
    /// Failing to name the generation is an error. Failing to create it is
    /// only logged: the import then runs against a missing index and its bulk
    /// writes fail individually.
    pub fn ensure_index(&mut self, body: &Value) -> Result<String, EngineError> {
        let index = self.index_name()?;

        match self.engine.index_exists(&index) {
            Ok(true) => log::info!("Index {index} already existed"),
            Ok(false) => match self.engine.create_index(&index, body) {
                Ok(()) => log::info!("Index {index} created"),
                Err(e) => log::error!("Index {index} could not be created: {e}"),
            },
            Err(e) => log::error!("Index {index} could not be checked: {e}"),
        }

        Ok(index)
    }

    /// Open the generation for importing.
    ///
    /// The returned guard discards the generation unless
    /// [`Generation::commit`] succeeds, and runs [`cleanup`](Self::cleanup)
    /// either way.
    pub fn begin(&mut self) -> Result<Generation<'_, 'e, E>, EngineError> {
        let index = self.index_name()?;
        Ok(Generation {
            lifecycle: self,
            index,
            committed: false,
        })
    }

    /// Point the alias at this run's generation.
    ///
    /// The new generation is attached before any current target of the alias
    /// is detached, all in a single alias update. A generation that does not
    /// exist is never published. Old generations are left in place for
    /// [`cleanup`](Self::cleanup).
    pub fn publish(&mut self) -> Result<(), EngineError> {
        let index = self.index_name()?;

        if !self.engine.index_exists(&index)? {
            return Err(EngineError::status(
                404,
                format!("index [{index}] missing, alias {} left in place", self.alias),
            ));
        }

        let current = if self.engine.alias_exists(&self.alias)? {
            self.engine.get_alias(&self.alias)?
        } else {
            Vec::new()
        };

        let mut actions = vec![AliasAction::Add {
            index: index.clone(),
            alias: self.alias.clone(),
        }];
        actions.extend(
            current
                .iter()
                .filter(|old| **old != index)
                .map(|old| AliasAction::Remove {
                    index: old.clone(),
                    alias: self.alias.clone(),
                }),
        );

        self.engine.update_aliases(&actions)?;

        for old in current.iter().filter(|old| **old != index) {
            log::info!("Deleted alias {} from index {old}", self.alias);
        }
        log::info!("Created alias {} for index {index}", self.alias);
        Ok(())
    }

    /// Delete this run's generation if it exists. Errors are logged.
    pub fn discard(&mut self) {
        let Some(index) = self.index_name.clone() else {
            return;
        };
        match self.engine.index_exists(&index) {
            Ok(true) => match self.engine.delete_index(&index) {
                Ok(()) => log::info!("Deleted incomplete index {index}"),
                Err(e) => log::error!("Incomplete index {index} could not be deleted: {e}"),
            },
            Ok(false) => {}
            Err(e) => log::error!("Incomplete index {index} could not be checked: {e}"),
        }
    }

    /// Delete every generation of this alias that no alias points to.
    ///
    /// Safe to repeat. Returns the deleted names; individual delete failures
    /// are logged and skipped.
    pub fn cleanup(&self) -> Result<Vec<String>, EngineError> {
        let prefix = format!("{}_", self.alias);
        let mut deleted = Vec::new();

        for (index, aliases) in self.engine.list_indices(&prefix)? {
            if !aliases.is_empty() {
                continue;
            }
            match self.engine.delete_index(&index) {
                Ok(()) => {
                    log::info!("Deleted index {index}");
                    deleted.push(index);
                }
                Err(e) => log::error!("Index {index} could not be deleted: {e}"),
            }
        }

        Ok(deleted)
    }
}

/// In-progress generation.
///
/// Dropping it uncommitted deletes the generation; dropping it in any state
/// runs alias-less cleanup. Readers therefore never see a half-built index
/// behind the alias.
pub struct Generation<'l, 'e, E: SearchEngine + ?Sized> {
    lifecycle: &'l mut IndexLifecycle<'e, E>,
    index: String,
    committed: bool,
}

impl<E: SearchEngine + ?Sized> Generation<'_, '_, E> {
    /// Index being written by this run
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Publish the generation under the alias.
    ///
    /// On error the guard is dropped uncommitted and the generation discarded.
    pub fn commit(mut self) -> Result<(), EngineError> {
        self.lifecycle.publish()?;
        self.committed = true;
        Ok(())
    }
}

impl<E: SearchEngine + ?Sized> Drop for Generation<'_, '_, E> {
    fn drop(&mut self) {
        if !self.committed {
            self.lifecycle.discard();
        }
        if let Err(e) = self.lifecycle.cleanup() {
            log::error!("Cleanup of stale {} indices failed: {e}", self.lifecycle.alias());
        }
    }
}
