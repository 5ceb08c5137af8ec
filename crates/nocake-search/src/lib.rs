//! Nocake Search - search engine boundary for the catalog importer
//!
//! Wraps the engine's administrative and bulk APIs behind [`SearchEngine`]
//! and builds the rebuild protocol on top of it:
//!
//! - [`BulkBatcher`] buffers documents and flushes fixed-size bulk writes
//! - [`IndexLifecycle`] names and creates a fresh index generation, swaps the
//!   public alias onto it and deletes alias-less generations
//!
//! Two engines are provided: [`HttpEngine`] talks to Elasticsearch over REST,
//! [`MemoryEngine`] keeps everything in process for tests and dry runs.

pub mod batcher;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod memory;

// Re-exports
pub use batcher::{BatchStats, BulkBatcher, DEFAULT_BATCH_SIZE};
pub use engine::{AliasAction, BulkOperation, BulkResponse, EngineError, SearchEngine};
pub use http::HttpEngine;
pub use lifecycle::{Generation, IndexLifecycle, generation_name, next_ordinal};
pub use memory::{BulkCall, MemoryEngine};
