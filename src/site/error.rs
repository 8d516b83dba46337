//! Error types for site adapter operations.
//!
//! Every variant carries the URL being processed plus a short reason, following
//! the What/Why/Fix pattern used across the project.

use thiserror::Error;

/// Errors a site adapter can return while discovering series, chapters or pages.
#[derive(Debug, Clone, Error)]
pub enum SiteError {
    /// The request to the site failed (network error, timeout or error status).
    #[error("request failed for '{url}': {reason}")]
    RequestFailed {
        /// The URL that was requested.
        url: String,
        /// Why the request failed.
        reason: String,
    },

    /// The site answered but the markup or payload could not be understood.
    #[error("could not parse response from '{url}': {reason}")]
    ParseFailed {
        /// The URL whose response could not be parsed.
        url: String,
        /// What was missing or malformed.
        reason: String,
    },

    /// A logged-in session is required.
    #[error(
        "unauthorized for '{url}': please log in\n  Suggestion: pass a cookie file with --cookie"
    )]
    Unauthorized {
        /// The URL that required a session.
        url: String,
    },

    /// The session is valid but the content is gated behind an access tier.
    #[error("forbidden for '{url}': {reason}")]
    Forbidden {
        /// The gated URL.
        url: String,
        /// The access-tier explanation.
        reason: String,
    },

    /// The page is not a chapter page of this site.
    #[error("invalid page '{url}'")]
    InvalidPage {
        /// The offending URL.
        url: String,
    },

    /// The given URL cannot be handled by the adapter.
    #[error("invalid URL '{url}' for site {site}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// The adapter that rejected it.
        site: String,
    },
}

impl SiteError {
    /// Creates a `RequestFailed` error.
    #[must_use]
    pub fn request_failed(url: &str, reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(url: &str, reason: impl Into<String>) -> Self {
        Self::ParseFailed {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(url: &str) -> Self {
        Self::Unauthorized {
            url: url.to_string(),
        }
    }

    /// Creates a `Forbidden` error.
    #[must_use]
    pub fn forbidden(url: &str, reason: impl Into<String>) -> Self {
        Self::Forbidden {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidPage` error.
    #[must_use]
    pub fn invalid_page(url: &str) -> Self {
        Self::InvalidPage {
            url: url.to_string(),
        }
    }

    /// Creates an `InvalidUrl` error.
    #[must_use]
    pub fn invalid_url(url: &str, site: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            site: site.to_string(),
        }
    }

    /// Converts a reqwest failure into a `RequestFailed` error.
    #[must_use]
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let reason = if error.is_timeout() {
            "request timed out".to_string()
        } else if let Some(status) = error.status() {
            format!("HTTP {}", status.as_u16())
        } else {
            error.to_string()
        };
        Self::request_failed(url, reason)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_site_error_request_failed_message() {
        let err = SiteError::request_failed("https://example.com/serie", "HTTP 503");
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/serie"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn test_site_error_unauthorized_has_suggestion() {
        let msg = SiteError::unauthorized("https://example.com/ch/1").to_string();
        assert!(msg.contains("log in"), "missing hint in: {msg}");
        assert!(msg.contains("--cookie"), "missing suggestion in: {msg}");
    }

    #[test]
    fn test_site_error_forbidden_keeps_reason() {
        let err = SiteError::forbidden("https://example.com/ch/9", "requires a VIP user rank");
        assert!(err.to_string().contains("VIP"));
    }

    #[test]
    fn test_site_error_invalid_url_names_site() {
        let err = SiteError::invalid_url("not a url", "copymanga");
        let msg = err.to_string();
        assert!(msg.contains("copymanga"));
        assert!(msg.contains("not a url"));
    }
}
