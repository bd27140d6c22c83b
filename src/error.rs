//! Error types for fetching, configuration and rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a request against the indicators API.
///
/// Empty responses are not errors: a successful request that yields no usable
/// points becomes [`crate::chart::LoadState::Empty`].
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request never produced a response (connection refused, timeout, DNS...).
    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("GET {url} failed with HTTP {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    /// The body was not the JSON we expected.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }

    pub fn is_http(&self) -> bool {
        matches!(self, FetchError::Http { .. })
    }

    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Http { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read chart config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid chart config JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("invalid chart config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum RenderError {
    /// Errors bubbled up from a drawing backend (plotters reports them as Debug-only types).
    #[error("drawing backend error: {0}")]
    Backend(String),

    #[error("unsupported output format for {0} (expected .svg or .png)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid canvas size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}
