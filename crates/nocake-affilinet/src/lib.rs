//! Nocake Affilinet - product import from the affilinet network
//!
//! Rebuilds the product search index from the network's list catalog and
//! per-list XML feeds.
//!
//! # Features
//!
//! - Catalog parsing with header-located columns
//! - Feed download with a local cache and atomic writes
//! - Streaming XML parsing with quick-xml, one product in memory at a time
//! - Zero-downtime publishing through an index alias
//!
//! # Example
//!
//! ```ignore
//! use nocake_affilinet::{AffilinetClient, AffilinetConfig, ImportConfig, ImportPipeline};
//! use nocake_search::HttpEngine;
//!
//! let client = AffilinetClient::new(AffilinetConfig {
//!     partner_id: 493114,
//!     api_password: std::env::var("AFFILINET_PASSWORD")?,
//!     ..Default::default()
//! });
//! let engine = HttpEngine::new("http://localhost:9200");
//!
//! let summary = ImportPipeline::new(ImportConfig::default(), &client, &engine)
//!     .run(chrono::Local::now().date_naive())?;
//! println!("Indexed {} documents into {}", summary.documents, summary.index);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod parser;
pub mod retriever;
pub mod runner;
pub mod schema;
pub mod transform;

// Re-exports
pub use catalog::{ListDescriptor, parse_catalog};
pub use config::{AffilinetConfig, ImportConfig};
pub use error::{ImportError, RetrieveError};
pub use parser::{ProductStream, RawProductRecord, StreamStats};
pub use retriever::{AffilinetClient, CatalogFetcher, FeedRetriever};
pub use runner::{ImportPipeline, ListOutcome, ListStats, Summary};
pub use schema::product_index;
pub use transform::{ProductDocument, map_product};
