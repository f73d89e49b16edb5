use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures that abort a crawl run.
///
/// Fetch and parse problems never show up here: they are logged and the
/// affected page or row is dropped.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("unknown product '{name}' (available: {available})")]
    UnknownProduct { name: String, available: String },

    #[error("product '{name}' has no known request {field}; refusing to crawl")]
    UnconfiguredProduct { name: String, field: &'static str },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("dataset I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt dataset {} at line {line}: {source}", path.display())]
    CorruptDataset {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CrawlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CrawlError::Io {
            path: path.into(),
            source,
        }
    }

    /// Configuration errors are detected before any network activity.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CrawlError::UnknownProduct { .. }
                | CrawlError::UnconfiguredProduct { .. }
                | CrawlError::Settings(_)
                | CrawlError::Client(_)
        )
    }
}

/// Why a single page fetch was dropped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("response body is not JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("fetch task aborted: {0}")]
    Join(String),
}
