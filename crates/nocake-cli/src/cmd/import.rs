//! Import subcommand - rebuild the product index

use anyhow::Result;
use clap::{ArgAction, Args};
use clap::builder::BoolishValueParser;
use nocake_affilinet::{AffilinetClient, ImportPipeline, Summary};
use nocake_core::{SharedProgress, fmt_num};
use nocake_search::MemoryEngine;

use crate::cmd::print_table;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Download XML feeds before importing (0 reuses cached feeds)
    #[arg(long, default_value = "1", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub download: bool,

    /// Documents per bulk request
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Alias to publish the new index under
    #[arg(short, long)]
    pub alias: Option<String>,

    /// Import into an in-memory engine; nothing is published
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: ImportArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mut import_config = config.import_config();
    import_config.force_download = args.download;
    if let Some(batch_size) = args.batch_size {
        import_config.batch_size = batch_size;
    }
    if let Some(alias) = args.alias {
        import_config.alias = alias;
    }

    let client = AffilinetClient::new(config.affilinet_config());
    if client.config().api_password.is_empty() {
        log::warn!("No affilinet API password configured");
    }

    log::info!("Importing into alias {}", import_config.alias);
    log::info!("  Download: {}", if args.download { "yes" } else { "cached" });
    log::info!("  Feeds: {}", client.config().download_dir.display());

    let today = chrono::Local::now().date_naive();

    let summary = if args.dry_run {
        let engine = MemoryEngine::new();
        ImportPipeline::new(import_config, &client, &engine)
            .with_progress(progress.clone())
            .run(today)?
    } else {
        let engine = config.search_engine();
        log::info!("  Search engine: {}", engine.base_url());
        ImportPipeline::new(import_config, &client, &engine)
            .with_progress(progress.clone())
            .run(today)?
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &Summary) {
    print_table(
        "Import",
        &[
            ("Index", summary.index.clone()),
            (
                "Lists",
                format!(
                    "{}/{} imported ({} ignored, {} unavailable)",
                    summary.lists_imported,
                    summary.lists_total,
                    summary.lists_ignored,
                    summary.lists_unavailable
                ),
            ),
            (
                "Documents",
                format!(
                    "{} indexed ({} failed, {} malformed)",
                    fmt_num(summary.documents),
                    fmt_num(summary.failed_documents),
                    fmt_num(summary.skipped_products)
                ),
            ),
            ("Bulk requests", fmt_num(summary.flushes)),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );
}
