//! Typed errors for the harvesting pipeline.
//!
//! Missing listing fields and unreadable time labels are deliberately absent
//! here: they degrade an article or drop it from the window, they never fail
//! a harvest.

use crate::models::Article;
use thiserror::Error;

/// Rejected caller input. Raised before any network traffic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("search key is required")]
    EmptySearchTerm,

    #[error("maxArticlesPerSearch must be between 1 and {limit}, got {value}")]
    MaxResultsOutOfRange { value: i64, limit: usize },

    #[error("maxArticlesPerSearch is not a number: {raw}")]
    MaxResultsNotNumeric { raw: String },

    #[error("window must span at least one day")]
    EmptyWindow,
}

/// A single page retrieval failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors that end a harvest call.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Input(#[from] InputError),

    /// A page fetch failed. Articles admitted before the failure ride along so
    /// the caller can still use them.
    #[error("retrieval of {url} failed after {} article(s): {source}", .partial.len())]
    Retrieval {
        url: String,
        partial: Vec<Article>,
        pages_fetched: usize,
        #[source]
        source: FetchError,
    },
}

impl HarvestError {
    /// Articles collected before the failure; empty for input errors.
    pub fn into_partial(self) -> Vec<Article> {
        match self {
            HarvestError::Retrieval { partial, .. } => partial,
            HarvestError::Input(_) => Vec::new(),
        }
    }
}

/// The external classification stage failed for one text.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classifier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected classifier response: {0}")]
    UnexpectedResponse(String),

    #[error("unknown sentiment label: {0}")]
    UnknownLabel(String),
}

impl ClassifyError {
    /// Whether trying again might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifyError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClassifyError::Status { status, .. } => *status == 429 || *status >= 500,
            ClassifyError::UnexpectedResponse(_) | ClassifyError::UnknownLabel(_) => false,
        }
    }
}

/// Configuration could not be loaded or compiled.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid {name} selector {selector:?}: {reason}")]
    Selector {
        name: &'static str,
        selector: String,
        reason: String,
    },

    #[error("invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid allowed origin {origin:?}")]
    Origin { origin: String },

    #[error("invalid bind address {addr:?}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
