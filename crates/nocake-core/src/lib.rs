//! Nocake Core - Common infrastructure for the catalog import pipeline
//!
//! This crate provides the blocking HTTP facade, logging setup and
//! progress reporting shared by the source and search crates.

pub mod http;
pub mod logging;
pub mod progress;

// Re-exports for convenience
pub use http::{
    HttpConfig, HttpError, SHARED_RUNTIME, TextBody, content_type_charset, download_to_file,
    fetch_text, http_client, set_http_config,
};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
