//! Error types for the affilinet source

use nocake_core::HttpError;

/// Failure to obtain one list's feed file
#[derive(Debug)]
pub enum RetrieveError {
    /// Server answered with a non-success status; the list is skipped
    Unavailable { status: Option<u16> },
    /// Request failed before or during transfer
    Transport(HttpError),
    /// Local file system failure (download dir, cache file)
    Io(std::io::Error),
}

impl RetrieveError {
    /// Whether the run may continue with the next list
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Unavailable { .. })
    }
}

impl std::fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { status: Some(s) } => write!(f, "feed unavailable (HTTP {s})"),
            Self::Unavailable { status: None } => write!(f, "feed unavailable"),
            Self::Transport(e) => write!(f, "feed download failed: {e}"),
            Self::Io(e) => write!(f, "feed file: {e}"),
        }
    }
}

impl std::error::Error for RetrieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Unavailable { .. } => None,
        }
    }
}

impl From<std::io::Error> for RetrieveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Sort a download failure into skip-the-list vs. abort-the-run
impl From<HttpError> for RetrieveError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Http {
                status: Some(status),
                ..
            } => Self::Unavailable {
                status: Some(status),
            },
            HttpError::Io(io) => Self::Io(io),
            other => Self::Transport(other),
        }
    }
}

/// Fatal import errors
#[derive(Debug)]
pub enum ImportError {
    /// Catalog could not be fetched or has no `ListID` column
    CatalogUnavailable(String),
    /// Catalog parsed to zero lists
    EmptyCatalog,
    /// Feed of a list could not be retrieved
    Feed { list_id: u32, source: RetrieveError },
    /// Downloaded feed could not be opened
    FeedOpen { list_id: u32, source: std::io::Error },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatalogUnavailable(msg) => {
                write!(f, "Cannot retrieve affilinet catalog sources: {msg}")
            }
            Self::EmptyCatalog => write!(f, "No product lists found"),
            Self::Feed { list_id, source } => write!(f, "List {list_id}: {source}"),
            Self::FeedOpen { list_id, source } => {
                write!(f, "List {list_id}: cannot open feed: {source}")
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Feed { source, .. } => Some(source),
            Self::FeedOpen { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_not_fatal() {
        let err = RetrieveError::from(HttpError::Http {
            status: Some(404),
            message: "Not Found".into(),
        });
        assert!(matches!(err, RetrieveError::Unavailable { status: Some(404) }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn transport_and_io_errors_are_fatal() {
        let err = RetrieveError::from(HttpError::Http {
            status: None,
            message: "connection reset".into(),
        });
        assert!(matches!(err, RetrieveError::Transport(_)));
        assert!(err.is_fatal());

        let err = RetrieveError::from(HttpError::Io(std::io::Error::other("disk full")));
        assert!(matches!(err, RetrieveError::Io(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn display_names_list() {
        let err = ImportError::Feed {
            list_id: 42,
            source: RetrieveError::Io(std::io::Error::other("denied")),
        };
        assert_eq!(format!("{err}"), "List 42: feed file: denied");
        assert_eq!(format!("{}", ImportError::EmptyCatalog), "No product lists found");
    }
}
