//! Catalog and feed retrieval
//!
//! Feeds are cached under the download dir by the file name of their URL, so a
//! run without forced download reuses whatever an earlier run left there.

use std::path::PathBuf;

use nocake_core::{download_to_file, fetch_text, fmt_num};

use crate::catalog::ListDescriptor;
use crate::config::AffilinetConfig;
use crate::error::{ImportError, RetrieveError};

/// Source of the catalog text
pub trait CatalogFetcher {
    /// Catalog body, decoded to UTF-8
    fn fetch_catalog(&self) -> Result<String, ImportError>;
}

/// Source of per-list feed files
pub trait FeedRetriever {
    /// Local path of the list's XML feed, downloading it when needed.
    fn retrieve(&self, list: &ListDescriptor, force_download: bool)
        -> Result<PathBuf, RetrieveError>;
}

/// Last path segment of `url`, ignoring query and fragment
fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Affiliate network over HTTP
#[derive(Debug, Clone)]
pub struct AffilinetClient {
    config: AffilinetConfig,
}

impl AffilinetClient {
    pub fn new(config: AffilinetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AffilinetConfig {
        &self.config
    }

    /// Cache location of a list's feed
    pub fn local_path(&self, list_id: u32) -> PathBuf {
        let url = self.config.feed_url(list_id);
        self.config.download_dir.join(url_basename(&url))
    }
}

impl CatalogFetcher for AffilinetClient {
    fn fetch_catalog(&self) -> Result<String, ImportError> {
        let body = fetch_text(&self.config.catalog_url())
            .map_err(|e| ImportError::CatalogUnavailable(e.to_string()))?;
        if body.charset.is_none() {
            log::warn!("No charset found in catalog response, assuming UTF-8");
        }
        Ok(body.text)
    }
}

impl FeedRetriever for AffilinetClient {
    fn retrieve(
        &self,
        list: &ListDescriptor,
        force_download: bool,
    ) -> Result<PathBuf, RetrieveError> {
        let local = self.local_path(list.list_id);

        if !force_download && local.exists() {
            log::debug!("Using cached {}", local.display());
            return Ok(local);
        }

        std::fs::create_dir_all(&self.config.download_dir)?;

        let bytes = download_to_file(&self.config.feed_url(list.list_id), &local)?;
        log::info!(
            "Downloaded list to {} ({} bytes)",
            local.display(),
            fmt_num(bytes as usize)
        );
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(dir: &std::path::Path) -> AffilinetClient {
        AffilinetClient::new(AffilinetConfig {
            partner_id: 493114,
            api_password: "pw".to_string(),
            // nothing listens here; any network access fails the test
            feed_base_url: "http://127.0.0.1:9/".to_string(),
            download_dir: dir.join("feeds"),
            ..Default::default()
        })
    }

    fn list(list_id: u32) -> ListDescriptor {
        ListDescriptor {
            list_id,
            title: "Test".to_string(),
            expected_product_count: 1,
        }
    }

    #[test]
    fn basename_strips_query() {
        assert_eq!(
            url_basename("http://host/dir/affilinet_products_1_2.xml?auth=x"),
            "affilinet_products_1_2.xml"
        );
        assert_eq!(url_basename("plain.xml"), "plain.xml");
    }

    #[test]
    fn local_path_uses_url_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path());
        assert_eq!(
            client.local_path(7),
            dir.path().join("feeds").join("affilinet_products_7_493114.xml")
        );
    }

    #[test]
    fn cached_feed_reused_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path());
        let cached = client.local_path(7);
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, "<products/>").unwrap();

        let path = client.retrieve(&list(7), false).unwrap();
        assert_eq!(path, cached);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<products/>");
    }

    /// Run with: cargo test -p nocake-affilinet -- --ignored missing_feed
    #[test]
    #[ignore]
    fn missing_feed_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let client = AffilinetClient::new(AffilinetConfig {
            download_dir: dir.path().to_path_buf(),
            ..Default::default()
        });
        let err = client.retrieve(&list(1), true).unwrap_err();
        assert!(!err.is_fatal(), "{err}");
    }
}
