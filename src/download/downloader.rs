//! The comic downloader: one site adapter, one page fetcher, one destination.
//!
//! Chapter and serie operations are implemented in [`super::chapter`] and
//! [`super::serie`]; this module only holds the shared state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::client::{HttpImageFetcher, PageFetcher};
use super::config::DownloadConfig;
use super::progress::{DownloadProgress, ProgressObserver};
use crate::site::SiteAdapter;

/// Asks the user whether a serie download should proceed.
#[async_trait]
pub trait Confirm: Send + Sync {
    /// Returns true to proceed.
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmation that always answers the same.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Downloads chapters and series from one site into one destination.
pub struct ComicDownloader {
    pub(crate) adapter: Arc<dyn SiteAdapter>,
    pub(crate) fetcher: Arc<dyn PageFetcher>,
    pub(crate) destination: PathBuf,
    pub(crate) config: DownloadConfig,
    pub(crate) observer: Option<Arc<dyn ProgressObserver>>,
    pub(crate) confirm: Arc<dyn Confirm>,
}

impl ComicDownloader {
    /// Creates a downloader fetching pages with the adapter's HTTP client.
    #[must_use]
    pub fn new(adapter: Arc<dyn SiteAdapter>, destination: impl Into<PathBuf>, config: DownloadConfig) -> Self {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(
            adapter
                .http_client()
                .cloned()
                .map(HttpImageFetcher::new)
                .unwrap_or_default(),
        );
        Self::with_fetcher(adapter, fetcher, destination, config)
    }

    /// Creates a downloader with an explicit page fetcher.
    #[must_use]
    pub fn with_fetcher(
        adapter: Arc<dyn SiteAdapter>,
        fetcher: Arc<dyn PageFetcher>,
        destination: impl Into<PathBuf>,
        config: DownloadConfig,
    ) -> Self {
        Self {
            adapter,
            fetcher,
            destination: destination.into(),
            config: config.normalized(),
            observer: None,
            confirm: Arc::new(AutoConfirm(true)),
        }
    }

    /// Registers the observer receiving chapter events.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets how serie downloads are confirmed.
    #[must_use]
    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    /// The site adapter in use.
    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn SiteAdapter> {
        &self.adapter
    }

    /// Root directory of all output.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// The normalized engine settings.
    #[must_use]
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub(crate) fn notify_start(&self, index: Option<u32>, name: &str) {
        if let Some(observer) = &self.observer {
            observer.on_start(index, name);
        }
    }

    pub(crate) fn notify(&self, progress: &DownloadProgress) {
        if let Some(observer) = &self.observer {
            observer.on_progress(progress);
        }
    }
}

impl std::fmt::Debug for ComicDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComicDownloader")
            .field("site", &self.adapter.site_name())
            .field("destination", &self.destination)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
