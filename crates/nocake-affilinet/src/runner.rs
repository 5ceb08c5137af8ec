//! Import pipeline: catalog → feeds → documents → new index generation

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::ProgressBar;
use nocake_core::{ProgressContext, SharedProgress, fmt_num};
use nocake_search::{BatchStats, BulkBatcher, IndexLifecycle, SearchEngine};
use rustc_hash::FxHashSet;

use crate::catalog::{ListDescriptor, parse_catalog};
use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::parser::{ProductStream, StreamStats};
use crate::retriever::{CatalogFetcher, FeedRetriever};
use crate::schema::product_index;
use crate::transform::map_product;

/// Progress line refresh interval, in documents
const PROGRESS_EVERY: usize = 1000;

/// Counters for one imported list
#[derive(Debug, Clone, Default)]
pub struct ListStats {
    pub documents: BatchStats,
    pub stream: StreamStats,
}

/// Result of importing one list that did not abort the run
#[derive(Debug, Clone)]
pub enum ListOutcome {
    Imported(ListStats),
    /// Feed not offered by the server; list skipped
    Unavailable,
}

/// Import run summary
#[derive(Debug, Default)]
pub struct Summary {
    /// Generation the alias now points to
    pub index: String,
    pub lists_total: usize,
    pub lists_imported: usize,
    pub lists_ignored: usize,
    pub lists_unavailable: usize,
    pub documents: usize,
    pub failed_documents: usize,
    pub skipped_products: usize,
    pub flushes: usize,
    pub elapsed: Duration,
}

impl Summary {
    fn add_list(&mut self, stats: &ListStats) {
        self.lists_imported += 1;
        self.documents += stats.documents.indexed();
        self.failed_documents += stats.documents.failed_documents;
        self.skipped_products += stats.stream.skipped;
        self.flushes += stats.documents.flushes;
    }

    fn log(&self) {
        log::info!("=== Import Summary ===");
        log::info!("Index: {}", self.index);
        log::info!(
            "Lists: {}/{} imported ({} ignored, {} unavailable)",
            self.lists_imported,
            self.lists_total,
            self.lists_ignored,
            self.lists_unavailable
        );
        log::info!(
            "Documents: {} indexed, {} failed, {} malformed products skipped",
            fmt_num(self.documents),
            fmt_num(self.failed_documents),
            fmt_num(self.skipped_products)
        );
        log::info!("Bulk requests: {}", fmt_num(self.flushes));
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());

        if self.documents > 0 && self.elapsed.as_secs_f64() > 0.0 {
            let rate = self.documents as f64 / self.elapsed.as_secs_f64();
            log::info!("Throughput: {rate:.0} documents/sec");
        }
    }
}

/// Rebuilds the product index from the affiliate network.
///
/// A run fetches the catalog, creates a fresh index generation, imports every
/// non-ignored list into it and then moves the alias. Any fatal error leaves
/// the alias where it was and deletes the new generation.
pub struct ImportPipeline<'a, S: ?Sized, E: ?Sized> {
    config: ImportConfig,
    source: &'a S,
    engine: &'a E,
    progress: SharedProgress,
}

impl<'a, S, E> ImportPipeline<'a, S, E>
where
    S: CatalogFetcher + FeedRetriever + ?Sized,
    E: SearchEngine + ?Sized,
{
    pub fn new(config: ImportConfig, source: &'a S, engine: &'a E) -> Self {
        Self {
            config,
            source,
            engine,
            progress: Arc::new(ProgressContext::hidden()),
        }
    }

    /// Draw per-list progress lines on this context
    pub fn with_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Run a full rebuild, naming the generation after `today`.
    pub fn run(&self, today: NaiveDate) -> Result<Summary> {
        let start = Instant::now();

        log::info!("Fetching affilinet catalog...");
        let catalog = self.source.fetch_catalog()?;
        let lists = parse_catalog(&catalog)?;
        log::info!("Found {} product lists", lists.len());

        let ignore: FxHashSet<u32> = self.config.ignore_lists.iter().copied().collect();

        let mut lifecycle = IndexLifecycle::new(self.engine, &self.config.alias, today);
        let index = lifecycle
            .ensure_index(&product_index(&self.config.analyzer))
            .context("Failed to determine the new index name")?;

        let mut summary = Summary {
            index: index.clone(),
            lists_total: lists.len(),
            ..Default::default()
        };

        let generation = lifecycle.begin()?;

        for list in &lists {
            if ignore.contains(&list.list_id) {
                log::info!("Ignoring '{}' (ListID: {})", list.title, list.list_id);
                summary.lists_ignored += 1;
                continue;
            }

            log::info!(
                "Importing {} products from '{}' (ListID: {})",
                fmt_num(list.expected_product_count as usize),
                list.title,
                list.list_id
            );

            match self.import_list(list, generation.index()) {
                Ok(ListOutcome::Imported(stats)) => summary.add_list(&stats),
                Ok(ListOutcome::Unavailable) => summary.lists_unavailable += 1,
                Err(e) => {
                    return Err(e).context(format!("Import aborted, discarding index {index}"));
                }
            }
        }

        generation.commit().with_context(|| {
            format!(
                "Failed to publish index {index} ({} of {} documents failed)",
                summary.failed_documents,
                summary.documents + summary.failed_documents
            )
        })?;

        summary.elapsed = start.elapsed();
        summary.log();
        Ok(summary)
    }

    /// Retrieve, parse and index one list into `index`.
    ///
    /// A feed the server does not offer is reported as
    /// [`ListOutcome::Unavailable`]; anything else that goes wrong with the
    /// feed aborts the run.
    pub fn import_list(
        &self,
        list: &ListDescriptor,
        index: &str,
    ) -> Result<ListOutcome, ImportError> {
        let path = match self.source.retrieve(list, self.config.force_download) {
            Ok(path) => path,
            Err(e) if !e.is_fatal() => {
                log::warn!("List {} skipped: {e}", list.list_id);
                return Ok(ListOutcome::Unavailable);
            }
            Err(source) => {
                return Err(ImportError::Feed {
                    list_id: list.list_id,
                    source,
                });
            }
        };

        let mut products = ProductStream::open(&path).map_err(|source| ImportError::FeedOpen {
            list_id: list.list_id,
            source,
        })?;

        let tag = list.list_tag();
        let pb = self.progress.list_line(&tag);
        let mut batcher = BulkBatcher::new(self.engine, index, self.config.batch_size);

        for (n, record) in products.by_ref().enumerate() {
            let document = map_product(&record, &tag);
            batcher.add(document.identity(), &document);
            if (n + 1) % PROGRESS_EVERY == 0 {
                report(&pb, n + 1, list.expected_product_count);
            }
        }

        let documents = batcher.finish();
        pb.finish_and_clear();

        let stats = ListStats {
            documents,
            stream: products.stats(),
        };
        log::info!(
            "{tag}: {} documents indexed ({} failed, {} malformed)",
            fmt_num(stats.documents.indexed()),
            fmt_num(stats.documents.failed_documents),
            fmt_num(stats.stream.skipped)
        );
        Ok(ListOutcome::Imported(stats))
    }
}

fn report(pb: &ProgressBar, done: usize, expected: u64) {
    pb.set_message(format!(
        "{} / {} products",
        fmt_num(done),
        fmt_num(expected as usize)
    ));
}
