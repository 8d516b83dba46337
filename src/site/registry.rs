//! Immutable site registry.
//!
//! The [`SiteRegistry`] is built once per run and maps site names and URLs to
//! adapters. Lookups never mutate it, so it can be shared freely.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::{CopymangaAdapter, SiteAdapter, SiteConfig, SiteError, ZerobywAdapter};

/// A fixed collection of site adapters, in registration order.
pub struct SiteRegistry {
    adapters: Vec<Arc<dyn SiteAdapter>>,
}

impl SiteRegistry {
    /// Creates a registry from a list of adapters.
    ///
    /// Adapter order decides which site wins when several can handle a URL.
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn SiteAdapter>>) -> Self {
        for adapter in &adapters {
            debug!(site = adapter.site_name(), "Registering site adapter");
        }
        Self { adapters }
    }

    /// Finds an adapter by site name (case-insensitive).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.site_name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// Finds the first adapter that can handle `url`.
    #[must_use]
    #[instrument(skip(self))]
    pub fn detect(&self, url: &str) -> Option<Arc<dyn SiteAdapter>> {
        let found = self
            .adapters
            .iter()
            .find(|adapter| adapter.can_handle_url(url))
            .cloned();
        debug!(site = found.as_ref().map(|a| a.site_name()), "Site detection finished");
        found
    }

    /// Registered site names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|adapter| adapter.site_name()).collect()
    }

    /// Iterates over all registered adapters.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SiteAdapter>> {
        self.adapters.iter()
    }

    /// Returns the number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns true if no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for SiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRegistry")
            .field("sites", &self.names())
            .finish()
    }
}

/// Builds the registry of all built-in sites.
///
/// # Errors
///
/// Returns [`SiteError`] when an adapter's HTTP client cannot be constructed.
pub fn build_default_site_registry(config: &SiteConfig) -> Result<SiteRegistry, SiteError> {
    let adapters: Vec<Arc<dyn SiteAdapter>> = vec![
        Arc::new(ZerobywAdapter::new(config)?),
        Arc::new(CopymangaAdapter::new(config)?),
    ];
    Ok(SiteRegistry::new(adapters))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::site::{AdapterOptions, PageList, SerieInfo};
    use async_trait::async_trait;

    struct StubAdapter {
        name: &'static str,
        host: &'static str,
    }

    #[async_trait]
    impl SiteAdapter for StubAdapter {
        fn site_name(&self) -> &str {
            self.name
        }

        fn can_handle_url(&self, url: &str) -> bool {
            url.contains(self.host)
        }

        fn url_completion(&self, shorthand: &str) -> String {
            format!("https://{}/{shorthand}", self.host)
        }

        async fn serie_info(&self, url: &str) -> Result<SerieInfo, SiteError> {
            Err(SiteError::invalid_page(url))
        }

        async fn image_list(
            &self,
            chapter_uri: &str,
            _adapter_options: &AdapterOptions,
        ) -> Result<PageList, SiteError> {
            Err(SiteError::invalid_page(chapter_uri))
        }

        fn base_url(&self) -> Option<String> {
            Some(format!("https://{}", self.host))
        }
    }

    fn stub_registry() -> SiteRegistry {
        SiteRegistry::new(vec![
            Arc::new(StubAdapter {
                name: "alpha",
                host: "alpha.example",
            }),
            Arc::new(StubAdapter {
                name: "beta",
                host: "beta.example",
            }),
        ])
    }

    #[test]
    fn test_registry_find_is_case_insensitive() {
        let registry = stub_registry();
        assert_eq!(registry.find("BETA").unwrap().site_name(), "beta");
        assert!(registry.find("gamma").is_none());
    }

    #[test]
    fn test_registry_detect_by_url() {
        let registry = stub_registry();
        let adapter = registry.detect("https://alpha.example/serie/1").unwrap();
        assert_eq!(adapter.site_name(), "alpha");
        assert!(registry.detect("https://unknown.example").is_none());
    }

    #[test]
    fn test_registry_names_keep_registration_order() {
        assert_eq!(stub_registry().names(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_default_registry_contains_builtin_sites() {
        let registry = build_default_site_registry(&SiteConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["zerobyw", "copymanga"]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }
}
