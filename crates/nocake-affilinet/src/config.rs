//! Affilinet import configuration

use std::path::PathBuf;

use nocake_search::DEFAULT_BATCH_SIZE;

/// Folder under the system temp dir that caches downloaded feeds
pub const DOWNLOAD_DIR_NAME: &str = "affilinet_importer_download";

/// Lists that are never imported
pub const DEFAULT_IGNORE_LISTS: [u32; 4] = [4745, 3661, 1206, 5915];

/// Credentials and endpoints of the affiliate network
#[derive(Debug, Clone)]
pub struct AffilinetConfig {
    pub partner_id: u32,
    pub api_password: String,
    /// Catalog CSV endpoint; `PartnerID` and `csvPW` are appended as query
    pub catalog_url: String,
    /// Feed directory; `affilinet_products_<list>_<partner>.xml` is appended
    pub feed_base_url: String,
    /// Local feed cache
    pub download_dir: PathBuf,
}

impl Default for AffilinetConfig {
    fn default() -> Self {
        Self {
            partner_id: 0,
            api_password: String::new(),
            catalog_url: "http://publisher.affili.net/Download/AutoDownload.aspx".to_string(),
            feed_base_url: "http://productdata.download.affili.net/".to_string(),
            download_dir: std::env::temp_dir().join(DOWNLOAD_DIR_NAME),
        }
    }
}

impl AffilinetConfig {
    pub fn catalog_url(&self) -> String {
        format!(
            "{}?PartnerID={}&csvPW={}",
            self.catalog_url, self.partner_id, self.api_password
        )
    }

    pub fn feed_url(&self, list_id: u32) -> String {
        format!(
            "{}/affilinet_products_{list_id}_{}.xml?auth={}",
            self.feed_base_url.trim_end_matches('/'),
            self.partner_id,
            self.api_password
        )
    }
}

/// Runtime configuration for one import run
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Public alias readers query
    pub alias: String,
    /// Documents per bulk request
    pub batch_size: usize,
    /// List ids skipped entirely
    pub ignore_lists: Vec<u32>,
    /// Language analyzer for `title` and `description`
    pub analyzer: String,
    /// Re-download feeds even when a cached copy exists
    pub force_download: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            alias: "nocake".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            ignore_lists: DEFAULT_IGNORE_LISTS.to_vec(),
            analyzer: "german".to_string(),
            force_download: true,
        }
    }
}
