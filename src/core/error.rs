//! Error types for the extraction pipeline.
//!
//! Only [`ExtractError`] ever reaches the caller of an extraction. Every other
//! error here is contained inside the strategy that hit it and is surfaced
//! through logs and the [`ExtractionReport`](crate::core::ExtractionReport).

use std::time::Duration;
use thiserror::Error;

/// A GET against a page or sub-resource failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// An obfuscated payload did not decode to a usable string. The candidate is
/// dropped; this never fails a strategy.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded payload is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failure local to one strategy. Never aborts sibling strategies.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("external extractor failed: {0}")]
    External(String),

    #[error("external extractor could not be started: {0}")]
    Io(#[from] std::io::Error),
}

/// Hard failure of a whole extraction call.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid page url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported url scheme '{scheme}' (expected http or https)")]
    UnsupportedScheme { scheme: String },

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("extraction cancelled")]
    Cancelled,
}
