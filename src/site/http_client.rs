//! Shared HTTP client construction policy for site adapters.
//!
//! Every adapter builds its client here so timeout, user agent, compression
//! and credentials stay consistent across sites. The same client is later
//! reused to fetch the pages of that site.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::user_agent;

use super::SiteError;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Connection and credential settings shared by all adapters of a run.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Cookie header contents read from an explicit cookie file.
    pub cookie: Option<String>,
    /// Directory holding `<site>.txt` cookie files, used when `cookie` is unset.
    pub cookie_dir: Option<PathBuf>,
    /// Raw cookie or token string, used when no cookie file is available.
    pub auth: Option<String>,
    /// Preferred image format for sites that serve several (`webp`, `jpg`).
    pub format: Option<String>,
    /// Chapter group for sites that publish series in groups.
    pub group: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: user_agent::default_user_agent(),
            cookie: None,
            cookie_dir: None,
            auth: None,
            format: None,
            group: None,
        }
    }
}

impl SiteConfig {
    /// Resolves the cookie header for a site.
    ///
    /// Precedence: explicit cookie file, then `<cookie_dir>/<site>.txt`, then `auth`.
    #[must_use]
    pub fn cookie_for(&self, site_name: &str) -> Option<String> {
        if let Some(cookie) = &self.cookie {
            return Some(cookie.trim().to_string());
        }
        let from_dir = self.cookie_dir.as_ref().and_then(|dir| {
            let path = dir.join(format!("{site_name}.txt"));
            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    debug!(site = site_name, path = %path.display(), "Using local cookie file");
                    Some(contents.trim().to_string())
                }
                Err(_) => None,
            }
        });
        from_dir
            .or_else(|| self.auth.as_ref().map(|auth| auth.trim().to_string()))
            .filter(|cookie| !cookie.is_empty())
    }
}

/// Builds the HTTP client for one site.
///
/// `site_headers` are sent on every request in addition to the cookie header.
///
/// # Errors
///
/// Returns [`SiteError::RequestFailed`] when the client cannot be constructed
/// or the cookie contains bytes that are not valid in a header.
pub fn build_site_http_client(
    config: &SiteConfig,
    site_name: &str,
    mut site_headers: HeaderMap,
) -> Result<Client, SiteError> {
    if let Some(cookie) = config.cookie_for(site_name) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                site_headers.insert(COOKIE, value);
            }
            Err(error) => {
                warn!(site = site_name, error = %error, "Ignoring cookie with invalid header bytes");
            }
        }
    }

    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .default_headers(site_headers)
        .gzip(true)
        .build()
        .map_err(|error| {
            SiteError::request_failed(site_name, format!("HTTP client construction failed: {error}"))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_site_config_default_timeout() {
        let config = SiteConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert!(config.user_agent.starts_with("comic-dl/"));
    }

    #[test]
    fn test_cookie_for_prefers_explicit_cookie() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("zerobyw.txt"), "from=dir").unwrap();
        let config = SiteConfig {
            cookie: Some("from=file\n".to_string()),
            cookie_dir: Some(dir.path().to_path_buf()),
            auth: Some("from=auth".to_string()),
            ..SiteConfig::default()
        };
        assert_eq!(config.cookie_for("zerobyw").as_deref(), Some("from=file"));
    }

    #[test]
    fn test_cookie_for_falls_back_to_site_file_then_auth() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("zerobyw.txt"), "from=dir\n").unwrap();
        let config = SiteConfig {
            cookie_dir: Some(dir.path().to_path_buf()),
            auth: Some("from=auth".to_string()),
            ..SiteConfig::default()
        };
        assert_eq!(config.cookie_for("zerobyw").as_deref(), Some("from=dir"));
        assert_eq!(config.cookie_for("copymanga").as_deref(), Some("from=auth"));
    }

    #[test]
    fn test_cookie_for_none_when_unconfigured() {
        assert!(SiteConfig::default().cookie_for("zerobyw").is_none());
    }

    #[test]
    fn test_build_site_http_client_succeeds() {
        let config = SiteConfig {
            auth: Some("token=abc".to_string()),
            ..SiteConfig::default()
        };
        assert!(build_site_http_client(&config, "zerobyw", HeaderMap::new()).is_ok());
    }
}
