//! Search engine boundary: administrative and bulk write operations

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Error from a search engine call
#[derive(Debug)]
pub enum EngineError {
    /// Engine answered with a non-success status, or did not answer (`None`)
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Request or response body could not be (de)serialized
    Json(serde_json::Error),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "search engine returned {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "search engine unreachable: {message}"),
            Self::Json(e) => write!(f, "search engine payload: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl EngineError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    pub(crate) fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// One `index` action of a bulk request: upsert `source` under `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub id: String,
    pub source: Value,
}

/// Outcome of a bulk request that reached the engine
#[derive(Debug, Clone, Default)]
pub struct BulkResponse {
    /// Number of actions the engine reported on
    pub items: usize,
    /// Actions rejected individually
    pub failed: usize,
    /// First per-item failure, for logging
    pub first_error: Option<String>,
}

/// One step of an alias update.
///
/// Serializes to the `_aliases` action shape, e.g.
/// `{"remove":{"index":"nocake_20240101_1","alias":"nocake"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    /// The action that undoes this one
    pub fn inverse(&self) -> Self {
        match self.clone() {
            Self::Add { index, alias } => Self::Remove { index, alias },
            Self::Remove { index, alias } => Self::Add { index, alias },
        }
    }
}

/// Administrative and write API of the search engine.
///
/// Calls are blocking; the importer never has more than one in flight.
pub trait SearchEngine {
    fn index_exists(&self, index: &str) -> Result<bool, EngineError>;

    /// Create `index` with the given settings/mappings body.
    fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError>;

    fn delete_index(&self, index: &str) -> Result<(), EngineError>;

    fn alias_exists(&self, alias: &str) -> Result<bool, EngineError>;

    /// Indices the alias currently resolves to (empty when the alias is unknown).
    fn get_alias(&self, alias: &str) -> Result<Vec<String>, EngineError>;

    fn put_alias(&self, index: &str, alias: &str) -> Result<(), EngineError>;

    fn delete_alias(&self, index: &str, alias: &str) -> Result<(), EngineError>;

    /// Apply alias actions in order.
    ///
    /// The provided implementation issues one call per action. When one fails,
    /// the actions already applied are undone in reverse order before the
    /// error is returned. Engines with a native multi-action endpoint override
    /// it.
    fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError> {
        let apply = |action: &AliasAction| match action {
            AliasAction::Add { index, alias } => self.put_alias(index, alias),
            AliasAction::Remove { index, alias } => self.delete_alias(index, alias),
        };

        for (done, action) in actions.iter().enumerate() {
            if let Err(e) = apply(action) {
                for applied in actions[..done].iter().rev() {
                    if let Err(undo) = apply(&applied.inverse()) {
                        log::error!("Alias rollback of {applied:?} failed: {undo}");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// All indices whose name starts with `prefix`, with their aliases.
    fn list_indices(&self, prefix: &str) -> Result<BTreeMap<String, Vec<String>>, EngineError>;

    /// Upsert every operation into `index` in one request.
    fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, EngineError>;
}
