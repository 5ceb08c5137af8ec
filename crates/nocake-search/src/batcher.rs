//! Fixed-size bulk write batching

use serde::Serialize;

use crate::engine::{BulkOperation, SearchEngine};

/// Reference batch size: documents per bulk request.
pub const DEFAULT_BATCH_SIZE: usize = 2500;

/// Counters for one batcher's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Documents passed to `add`, including ones that could not be serialized
    pub documents: usize,
    /// Bulk requests issued
    pub flushes: usize,
    /// Bulk requests that failed as a whole
    pub failed_batches: usize,
    /// Documents not stored (failed batches, rejected items, unserializable)
    pub failed_documents: usize,
}

impl BatchStats {
    /// Documents the engine accepted
    pub fn indexed(&self) -> usize {
        self.documents.saturating_sub(self.failed_documents)
    }

    /// Fold another batcher's counters into this one
    pub fn merge(&mut self, other: &BatchStats) {
        self.documents += other.documents;
        self.flushes += other.flushes;
        self.failed_batches += other.failed_batches;
        self.failed_documents += other.failed_documents;
    }
}

/// Buffered `(id, source)` pairs waiting for the next bulk request
#[derive(Debug, Default)]
struct Batch {
    operations: Vec<BulkOperation>,
}

impl Batch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            operations: Vec::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.operations.len()
    }

    fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Hand out the buffered operations, leaving the batch empty
    fn take(&mut self, capacity: usize) -> Vec<BulkOperation> {
        std::mem::replace(&mut self.operations, Vec::with_capacity(capacity))
    }
}

/// Accumulates documents and writes them to one index in fixed-size bulk requests.
///
/// The buffer is cleared after every flush whether or not the write succeeded;
/// failures are logged and counted, never retried. Call [`finish`](Self::finish)
/// after the last document. If the batcher is dropped without it (early return,
/// `?`), the remaining tail is still flushed.
pub struct BulkBatcher<'e, E: SearchEngine + ?Sized> {
    engine: &'e E,
    index: String,
    batch_size: usize,
    batch: Batch,
    stats: BatchStats,
    finished: bool,
}

impl<'e, E: SearchEngine + ?Sized> BulkBatcher<'e, E> {
    pub fn new(engine: &'e E, index: &str, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            engine,
            index: index.to_string(),
            batch_size,
            batch: Batch::with_capacity(batch_size),
            stats: BatchStats::default(),
            finished: false,
        }
    }

    /// Buffer `document` under `id`, flushing when the batch is full.
    pub fn add<T: Serialize + ?Sized>(&mut self, id: impl Into<String>, document: &T) {
        let id = id.into();
        self.stats.documents += 1;
        let source = match serde_json::to_value(document) {
            Ok(source) => source,
            Err(e) => {
                log::error!("Document {id} could not be serialized: {e}");
                self.stats.failed_documents += 1;
                return;
            }
        };

        self.batch.operations.push(BulkOperation { id, source });

        if self.batch.len() >= self.batch_size {
            self.flush();
        }
    }

    /// Documents currently buffered
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Flush the remaining tail and return the final counters.
    pub fn finish(mut self) -> BatchStats {
        self.flush();
        self.finished = true;
        std::mem::take(&mut self.stats)
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let operations = self.batch.take(self.batch_size);
        self.stats.flushes += 1;

        match self.engine.bulk(&self.index, &operations) {
            Ok(response) if response.failed == 0 => {
                log::debug!("Indexed {} documents into {}", operations.len(), self.index);
            }
            Ok(response) => {
                self.stats.failed_documents += response.failed;
                log::error!(
                    "Bulk write to {}: {} of {} documents rejected (first: {})",
                    self.index,
                    response.failed,
                    operations.len(),
                    response.first_error.as_deref().unwrap_or("unknown")
                );
            }
            Err(e) => {
                self.stats.failed_batches += 1;
                self.stats.failed_documents += operations.len();
                log::error!(
                    "Bulk write of {} documents to {} failed: {e}",
                    operations.len(),
                    self.index
                );
            }
        }
    }
}

impl<E: SearchEngine + ?Sized> Drop for BulkBatcher<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            self.flush();
        }
    }
}
