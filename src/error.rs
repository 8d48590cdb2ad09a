//! Error taxonomy for the extractor.
//!
//! Only a handful of these are fatal to a run: [`ScrapeError::Config`],
//! [`ScrapeError::UrlList`] and [`ScrapeError::OutputWrite`]. Fetch failures
//! are recovered per URL by the batch driver, and a path step that does not
//! resolve is not an error at all (the field is simply `null`).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Malformed or structurally invalid site configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure reported by the HTTP client.
    #[error("HTTP client error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The server answered, but not with a success status.
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("URL list error: {0}")]
    UrlList(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to write {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScrapeError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Transport errors (timeouts, resets, DNS hiccups) and the usual
    /// "try again later" statuses are retryable; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Fetch(_) => true,
            ScrapeError::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
