//! Config subcommand - show the effective configuration

use anyhow::Result;

use crate::cmd::print_table;
use crate::config::Config;

fn secret(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => "configured".to_string(),
        _ => "not set".to_string(),
    }
}

pub fn run(config: &Config) -> Result<()> {
    let ignore = config
        .affilinet
        .ignore_lists
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    print_table(
        "Setting",
        &[
            ("Partner ID", config.affilinet.partner_id.to_string()),
            ("API password", secret(&config.affilinet.api_password)),
            ("Catalog URL", config.affilinet.catalog_url.clone()),
            ("Feed base URL", config.affilinet.feed_base_url.clone()),
            (
                "Download dir",
                config.affilinet.download_dir.display().to_string(),
            ),
            ("Ignored lists", ignore),
            ("Search URL", config.search.url.clone()),
            ("Alias", config.search.alias.clone()),
            (
                "Search user",
                config
                    .search
                    .username
                    .clone()
                    .unwrap_or_else(|| "none".to_string()),
            ),
            ("Search password", secret(&config.search.password)),
            ("Batch size", config.search.batch_size.to_string()),
            ("Analyzer", config.search.analyzer.clone()),
            (
                "Connect timeout",
                format!("{}s", config.http.connect_timeout),
            ),
        ],
    );
    Ok(())
}
