//! Error types for single-page fetches.
//!
//! A page failure is recoverable: the batch downloader counts it and moves on.
//! These variants exist so the count can be explained in logs.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;

/// Errors that can occur while fetching one page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The page URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The page URL.
        url: String,
    },

    /// The site answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The page URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response carried no bytes.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The page URL.
        url: String,
    },

    /// Neither an image name was given nor could one be read from the URI.
    #[error("cannot determine a file name for {url}")]
    FilenameUndetectable {
        /// The page URL.
        url: String,
    },

    /// File system error while writing the page.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The page URI is empty or was never resolved.
    #[error("invalid page URL: '{url}'")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },

    /// The archive sink rejected the entry.
    #[error("archive entry {name} failed: {source}")]
    Archive {
        /// The entry name.
        name: String,
        /// The underlying archive error.
        #[source]
        source: ArchiveError,
    },
}

impl FetchError {
    /// Creates a network error, classifying timeouts separately.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            return Self::Timeout { url };
        }
        Self::Network { url, source }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an empty body error.
    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a filename detection error.
    pub fn filename_undetectable(url: impl Into<String>) -> Self {
        Self::FilenameUndetectable { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an archive error.
    pub fn archive(name: impl Into<String>, source: ArchiveError) -> Self {
        Self::Archive {
            name: name.into(),
            source,
        }
    }

    /// Returns true when the page request itself failed (as opposed to local I/O).
    #[must_use]
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::HttpStatus { .. } | Self::EmptyBody { .. }
        )
    }
}
