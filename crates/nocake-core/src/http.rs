//! Blocking HTTP facade over a shared async client.
//!
//! Uses async reqwest internally on a small shared tokio runtime, but presents
//! a sync interface: the import pipeline issues one request at a time and
//! waits for it.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

/// Default connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings, applied once before the first request.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install the global transport settings.
///
/// Only the first call takes effect; later calls are logged and ignored.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already set, ignoring");
    }
}

/// Current transport settings (defaults if never set).
pub fn http_config() -> &'static HttpConfig {
    HTTP_CONFIG.get_or_init(HttpConfig::default)
}

/// Error types for HTTP operations
#[derive(Debug)]
pub enum HttpError {
    /// HTTP error with optional status code (`None` = no response at all)
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Create HTTP error for a response that arrived with a non-success status
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::Http {
            status: Some(status.as_u16()),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
    }

    /// Status code of the response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Io(_) => None,
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(http_config().connect_timeout)
        .pool_max_idle_per_host(2)
        .user_agent(concat!("nocake/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Decoded text response
#[derive(Debug)]
pub struct TextBody {
    pub text: String,
    /// `charset` parameter of the `Content-Type` header, if any
    pub charset: Option<String>,
}

/// Extract the `charset` parameter from a `Content-Type` header value.
///
/// `text/csv; charset="ISO-8859-1"` → `ISO-8859-1`
pub fn content_type_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// HTTP GET → text decoded with the charset announced by the server.
///
/// Falls back to UTF-8 when the `Content-Type` header names no charset; the
/// returned [`TextBody::charset`] is `None` in that case so callers can warn.
pub fn fetch_text(url: &str) -> Result<TextBody, HttpError> {
    SHARED_RUNTIME.handle().block_on(async {
        let response = SHARED_CLIENT
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::from_status(status));
        }

        let charset = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_type_charset);

        let text = response
            .text_with_charset("utf-8")
            .await
            .map_err(|e| HttpError::from_reqwest(&e))?;

        Ok(TextBody { text, charset })
    })
}

/// Temporary sibling of `dest` used while a download is in flight
fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// HTTP GET streamed to `dest` with atomic tmp → rename.
///
/// The body is never held in memory; a failed transfer removes the partial
/// file so an earlier complete copy of `dest` is never clobbered by a
/// truncated one. Returns the number of bytes written.
pub fn download_to_file(url: &str, dest: &Path) -> Result<u64, HttpError> {
    let tmp = tmp_path(dest);

    let result = SHARED_RUNTIME.handle().block_on(async {
        let response = SHARED_CLIENT
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::from_status(status));
        }

        // Convert response body stream to AsyncRead
        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(io::Error::other));
        let mut reader = tokio_util::io::StreamReader::new(Box::pin(stream));

        let mut file = tokio::fs::File::create(&tmp).await?;
        let bytes = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok::<_, HttpError>(bytes)
    });

    match result {
        Ok(bytes) => {
            std::fs::rename(&tmp, dest)?;
            Ok(bytes)
        }
        Err(e) => {
            if tmp.exists() {
                let _ = std::fs::remove_file(&tmp);
            }
            Err(e)
        }
    }
}
