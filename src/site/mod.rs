//! Site adapters: per-site discovery of series, chapters and page lists.
//!
//! Each supported site implements [`SiteAdapter`]. The download engine only
//! talks to the trait, so adding a site never touches orchestration code.
//!
//! # Architecture
//!
//! - [`SiteAdapter`] - Async trait that individual sites implement
//! - [`SiteRegistry`] - Immutable lookup table built once per run
//! - [`SiteConfig`] - Timeout, user agent and credentials shared by adapters
//! - [`ZerobywAdapter`] - HTML scraping adapter
//! - [`CopymangaAdapter`] - JSON API adapter
//!
//! # Example
//!
//! ```no_run
//! use comic_dl_core::site::{build_default_site_registry, SiteConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_site_registry(&SiteConfig::default())?;
//! let url = "https://www.zerobyw.com/plugin.php?id=jameson_manhua&c=index&a=bofang&kuid=12345";
//! if let Some(adapter) = registry.detect(url) {
//!     let serie = adapter.serie_info(url).await?;
//!     println!("{} has {} chapters", serie.title, serie.chapters.len());
//! }
//! # Ok(())
//! # }
//! ```

mod copymanga;
mod error;
mod http_client;
mod registry;
mod zerobyw;

pub use copymanga::CopymangaAdapter;
pub use error::SiteError;
pub use http_client::{SiteConfig, build_site_http_client, DEFAULT_TIMEOUT_MS};
pub use registry::{SiteRegistry, build_default_site_registry};
pub use zerobyw::ZerobywAdapter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::metadata::ComicInfo;

/// Opaque per-chapter options handed back to the adapter when resolving pages.
pub type AdapterOptions = serde_json::Map<String, serde_json::Value>;

/// Ordered page URIs of a chapter. `None` marks a page that could not be resolved.
pub type PageList = Vec<Option<String>>;

/// One chapter of a serie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Stable identity used for selection and retries.
    pub index: u32,
    /// Display name, also used as the folder or archive name.
    pub name: String,
    /// Chapter page URI; `None` when the site did not expose one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Passed back verbatim to [`SiteAdapter::image_list`].
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub adapter_options: AdapterOptions,
}

impl Chapter {
    /// Creates a chapter without adapter options.
    #[must_use]
    pub fn new(index: u32, name: impl Into<String>, uri: Option<String>) -> Self {
        Self {
            index,
            name: name.into(),
            uri,
            adapter_options: AdapterOptions::new(),
        }
    }
}

/// A serie as described by its site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerieInfo {
    pub title: String,
    /// Chapters in ascending index order.
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<ComicInfo>,
}

/// Trait implemented by every supported site.
///
/// Adapters are shared across tasks, so implementations must be `Send + Sync`.
/// Mutable state (the detected base URL) lives behind interior mutability.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Short unique site name, also used for cookie files and presets.
    fn site_name(&self) -> &str;

    /// Returns true if `url` belongs to this site.
    fn can_handle_url(&self, url: &str) -> bool;

    /// Expands a site-specific shorthand (usually a serie id) into a full URL.
    fn url_completion(&self, shorthand: &str) -> String;

    /// Fetches the serie title, chapter list and optional metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] when the page cannot be fetched or understood.
    async fn serie_info(&self, url: &str) -> Result<SerieInfo, SiteError>;

    /// Resolves the ordered page URIs of one chapter.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] when the chapter is unavailable, gated or malformed.
    async fn image_list(
        &self,
        chapter_uri: &str,
        adapter_options: &AdapterOptions,
    ) -> Result<PageList, SiteError>;

    /// Learns the site's base URL from a serie or chapter URL.
    ///
    /// Sites served from rotating mirrors override this; the default keeps
    /// the configured base.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::InvalidUrl`] when no base can be derived.
    async fn detect_base_url(&self, _url: &str) -> Result<(), SiteError> {
        Ok(())
    }

    /// Current base URL used to absolutize relative page URIs.
    fn base_url(&self) -> Option<String>;

    /// Preset defaults this site prefers, as a camelCase option object.
    fn preferred_presets(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    /// HTTP client carrying this site's cookies and headers, for page fetching.
    fn http_client(&self) -> Option<&reqwest::Client> {
        None
    }
}

/// Joins a possibly relative page URI onto the adapter base URL.
///
/// Absolute URIs and URIs that cannot be joined are returned unchanged.
#[must_use]
pub fn absolute_page_uri(base_url: Option<&str>, uri: &str) -> String {
    if Url::parse(uri).is_ok() {
        return uri.to_string();
    }
    base_url
        .and_then(|base| Url::parse(base).ok())
        .and_then(|base| base.join(uri).ok())
        .map_or_else(|| uri.to_string(), |joined| joined.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_page_uri_keeps_absolute() {
        assert_eq!(
            absolute_page_uri(Some("https://a.example"), "https://cdn.example/1.jpg"),
            "https://cdn.example/1.jpg"
        );
    }

    #[test]
    fn test_absolute_page_uri_joins_relative() {
        assert_eq!(
            absolute_page_uri(Some("https://a.example/"), "/img/01.jpg"),
            "https://a.example/img/01.jpg"
        );
    }

    #[test]
    fn test_absolute_page_uri_without_base_is_unchanged() {
        assert_eq!(absolute_page_uri(None, "img/01.jpg"), "img/01.jpg");
    }

    #[test]
    fn test_chapter_serde_omits_empty_options() {
        let chapter = Chapter::new(3, "Ch 3", Some("https://a.example/3".to_string()));
        let json = serde_json::to_value(&chapter).unwrap();
        assert!(json.get("adapter_options").is_none());
        let back: Chapter = serde_json::from_value(json).unwrap();
        assert_eq!(back, chapter);
    }
}
