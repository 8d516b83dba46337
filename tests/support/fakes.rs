//! In-memory site adapter and page fetcher for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use comic_dl_core::download::{FetchError, FetchOptions, FetchTarget, PageFetcher};
use comic_dl_core::metadata::ComicInfo;
use comic_dl_core::site::{AdapterOptions, Chapter, PageList, SerieInfo, SiteAdapter, SiteError};

pub const FAKE_BASE_URL: &str = "https://fake.example";

/// Serie URI understood by [`FakeSite`].
pub const SERIE_URI: &str = "https://fake.example/serie/1";

/// Site serving one serie whose chapters each have `pages_per_chapter` pages.
pub struct FakeSite {
    pub title: String,
    pub chapters: Vec<Chapter>,
    pub pages: HashMap<String, PageList>,
    pub info: Option<ComicInfo>,
    pub fail_serie_info: bool,
    pub image_list_calls: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new(indices: &[u32], pages_per_chapter: usize) -> Self {
        let chapters: Vec<Chapter> = indices
            .iter()
            .map(|&i| Chapter::new(i, format!("Chapter {i}"), Some(format!("/chapter/{i}"))))
            .collect();
        let pages = chapters
            .iter()
            .map(|chapter| {
                let uri = chapter.uri.clone().unwrap_or_default();
                let list = (1..=pages_per_chapter)
                    .map(|p| Some(format!("/img/{}/{p}.jpg", chapter.index)))
                    .collect();
                (uri, list)
            })
            .collect();
        Self {
            title: "Fake Serie".to_string(),
            chapters,
            pages,
            info: None,
            fail_serie_info: false,
            image_list_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_info(mut self, info: ComicInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn image_list_count(&self) -> usize {
        self.image_list_calls.lock().unwrap().len()
    }

    pub fn image_list_count_for(&self, chapter_uri: &str) -> usize {
        self.image_list_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|uri| uri.as_str() == chapter_uri)
            .count()
    }
}

#[async_trait]
impl SiteAdapter for FakeSite {
    fn site_name(&self) -> &str {
        "fake"
    }

    fn can_handle_url(&self, url: &str) -> bool {
        url.starts_with(FAKE_BASE_URL)
    }

    fn url_completion(&self, shorthand: &str) -> String {
        format!("{FAKE_BASE_URL}/serie/{shorthand}")
    }

    async fn serie_info(&self, url: &str) -> Result<SerieInfo, SiteError> {
        if self.fail_serie_info {
            return Err(SiteError::request_failed(url, "connection refused"));
        }
        Ok(SerieInfo {
            title: self.title.clone(),
            chapters: self.chapters.clone(),
            info: self.info.clone(),
        })
    }

    async fn image_list(
        &self,
        chapter_uri: &str,
        _adapter_options: &AdapterOptions,
    ) -> Result<PageList, SiteError> {
        self.image_list_calls
            .lock()
            .unwrap()
            .push(chapter_uri.to_string());
        self.pages
            .get(chapter_uri)
            .cloned()
            .ok_or_else(|| SiteError::invalid_page(chapter_uri))
    }

    fn base_url(&self) -> Option<String> {
        Some(FAKE_BASE_URL.to_string())
    }
}

/// Fetcher writing small fake images, with scripted failures.
#[derive(Default)]
pub struct FakeFetcher {
    /// Remaining failures per page URI; `usize::MAX` fails forever.
    pub failures: Mutex<HashMap<String, usize>>,
    pub requests: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Makes `uri` fail `times` times before succeeding.
    pub fn fail(self, uri: &str, times: usize) -> Self {
        self.failures.lock().unwrap().insert(uri.to_string(), times);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn should_fail(&self, uri: &str) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(uri) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(
        &self,
        target: &FetchTarget,
        page_uri: &str,
        options: &FetchOptions,
    ) -> Result<String, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(page_uri.to_string());

        if self.should_fail(page_uri) {
            return Err(FetchError::http_status(page_uri, 503));
        }

        let filename = format!("{}.jpg", options.image_name.clone().unwrap_or_default());
        let body = format!("image:{page_uri}").into_bytes();
        match target {
            FetchTarget::Directory(dir) => {
                let path = dir.join(&filename);
                tokio::fs::write(&path, body)
                    .await
                    .map_err(|e| FetchError::io(&path, e))?;
            }
            FetchTarget::Archive(sink) => {
                sink.append(&filename, body)
                    .await
                    .map_err(|e| FetchError::archive(filename.clone(), e))?;
            }
        }
        Ok(filename)
    }
}

/// Absolute URI of a page of [`FakeSite`].
pub fn page_uri(chapter: u32, page: usize) -> String {
    format!("{FAKE_BASE_URL}/img/{chapter}/{page}.jpg")
}
