//! Copymanga adapter backed by the site's JSON API.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::metadata::{ComicInfo, MANGA_RIGHT_TO_LEFT};

use super::{
    AdapterOptions, Chapter, PageList, SerieInfo, SiteAdapter, SiteConfig, SiteError,
    build_site_http_client,
};

const SITE_NAME: &str = "copymanga";
const DEFAULT_API_URL: &str = "https://api.copymanga.org";
const WEB_URL: &str = "https://www.copymanga.org";
const API_VERSION: &str = "2.2.0";
const CHAPTER_PAGE_SIZE: u64 = 500;
const DEFAULT_GROUP: &str = "default";

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    results: T,
}

#[derive(Debug, Deserialize)]
struct SerieResults {
    comic: ComicData,
    #[serde(default)]
    groups: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ComicData {
    name: String,
    #[serde(default)]
    brief: Option<String>,
    #[serde(default)]
    region: Option<Labelled>,
    #[serde(default)]
    status: Option<StatusValue>,
    #[serde(default)]
    author: Vec<Named>,
    #[serde(default)]
    theme: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Labelled {
    display: String,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChapterResults {
    #[serde(default)]
    list: Vec<ChapterItem>,
}

#[derive(Debug, Deserialize)]
struct ChapterItem {
    index: u32,
    name: String,
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct ImageResults {
    chapter: ImageChapter,
}

#[derive(Debug, Deserialize)]
struct ImageChapter {
    #[serde(default)]
    contents: Vec<ImageContent>,
    #[serde(default)]
    words: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct ImageContent {
    url: String,
}

/// Adapter for copymanga through `api.copymanga.org`.
#[derive(Debug)]
pub struct CopymangaAdapter {
    client: Client,
    api_url: RwLock<String>,
    group: String,
}

impl CopymangaAdapter {
    /// Creates the adapter against the public API.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the HTTP client cannot be built.
    pub fn new(config: &SiteConfig) -> Result<Self, SiteError> {
        Self::with_base_url(config, DEFAULT_API_URL)
    }

    /// Creates the adapter against a specific API base (tests).
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the HTTP client cannot be built.
    pub fn with_base_url(config: &SiteConfig, api_url: &str) -> Result<Self, SiteError> {
        let client = build_site_http_client(config, SITE_NAME, api_headers(config.format.as_deref()))?;
        Ok(Self {
            client,
            api_url: RwLock::new(api_url.trim_end_matches('/').to_string()),
            group: config
                .group
                .clone()
                .unwrap_or_else(|| DEFAULT_GROUP.to_string()),
        })
    }

    fn api(&self, path: &str) -> String {
        super::absolute_page_uri(self.base_url().as_deref(), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SiteError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| SiteError::from_reqwest(url, &error))?;
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|error| SiteError::parse_failed(url, error.to_string()))?;
        Ok(envelope.results)
    }

    async fn chapter_segment(&self, manga_id: &str, offset: u64) -> Result<Vec<Chapter>, SiteError> {
        let url = self.api(&format!(
            "/api/v3/comic/{manga_id}/group/{}/chapters?limit={CHAPTER_PAGE_SIZE}&offset={offset}&platform=3",
            self.group
        ));
        let results: ChapterResults = self.get_json(&url).await?;
        Ok(results
            .list
            .into_iter()
            .map(|item| {
                let uri = format!("/api/v3/comic/{manga_id}/chapter/{}?platform=3", item.uuid);
                Chapter::new(item.index, item.name, Some(uri))
            })
            .collect())
    }
}

fn api_headers(format: Option<&str>) -> HeaderMap {
    let webp = if format == Some("jpg") { "0" } else { "1" };
    let mut headers = HeaderMap::new();
    for (name, value) in [
        ("version", API_VERSION),
        ("platform", "1"),
        ("region", "0"),
        ("webp", webp),
    ] {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

fn manga_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(ToString::to_string)
}

fn group_count(groups: &serde_json::Map<String, serde_json::Value>, group: &str) -> u64 {
    groups
        .get(group)
        .and_then(|value| value.get("count"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0)
}

/// Places every URL at the position given by `words`; unplaced slots stay `None`.
fn order_pages(urls: Vec<String>, words: &[usize]) -> PageList {
    if words.is_empty() || words.len() != urls.len() {
        return urls.into_iter().map(Some).collect();
    }
    let len = words.iter().max().map_or(0, |max| max + 1).max(urls.len());
    let mut ordered: PageList = vec![None; len];
    for (url, &position) in urls.into_iter().zip(words) {
        ordered[position] = Some(url);
    }
    ordered
}

fn join_names(items: &[Named]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(","),
    )
}

#[async_trait]
impl SiteAdapter for CopymangaAdapter {
    fn site_name(&self) -> &str {
        SITE_NAME
    }

    fn can_handle_url(&self, url: &str) -> bool {
        url.contains(SITE_NAME)
    }

    fn url_completion(&self, shorthand: &str) -> String {
        let shorthand = shorthand.trim();
        if shorthand.starts_with("http://") || shorthand.starts_with("https://") {
            return shorthand.to_string();
        }
        format!("{WEB_URL}/comic/{shorthand}")
    }

    #[instrument(skip(self), fields(site = SITE_NAME, group = %self.group))]
    async fn serie_info(&self, url: &str) -> Result<SerieInfo, SiteError> {
        let id = manga_id(url).ok_or_else(|| SiteError::invalid_url(url, SITE_NAME))?;
        let results: SerieResults = self.get_json(&self.api(&format!("/api/v3/comic2/{id}"))).await?;
        let count = group_count(&results.groups, &self.group);
        let comic = results.comic;

        let info = ComicInfo {
            serie: Some(comic.name.clone()),
            summary: comic.brief.filter(|brief| !brief.is_empty()),
            location: comic.region.map(|region| region.display),
            count: Some(count.to_string()),
            web: Some(url.to_string()),
            status: comic.status.map(|status| {
                if status.value == 0 { "Ongoing" } else { "End" }.to_string()
            }),
            penciller: join_names(&comic.author),
            tags: join_names(&comic.theme),
            manga: Some(MANGA_RIGHT_TO_LEFT.to_string()),
            ..ComicInfo::default()
        };

        let segments = count.max(1).div_ceil(CHAPTER_PAGE_SIZE);
        let mut chapters = Vec::new();
        for segment in 0..segments {
            chapters.extend(self.chapter_segment(&id, segment * CHAPTER_PAGE_SIZE).await?);
        }
        chapters.sort_by_key(|chapter| chapter.index);
        debug!(title = %comic.name, chapters = chapters.len(), "Fetched serie from API");

        Ok(SerieInfo {
            title: comic.name,
            chapters,
            info: Some(info),
        })
    }

    #[instrument(skip(self, _adapter_options), fields(site = SITE_NAME))]
    async fn image_list(
        &self,
        chapter_uri: &str,
        _adapter_options: &AdapterOptions,
    ) -> Result<PageList, SiteError> {
        let url = self.api(chapter_uri);
        let results: ImageResults = self.get_json(&url).await?;
        let urls = results
            .chapter
            .contents
            .into_iter()
            .map(|content| content.url)
            .collect();
        Ok(order_pages(urls, &results.chapter.words))
    }

    fn base_url(&self) -> Option<String> {
        self.api_url.read().ok().map(|url| url.clone())
    }

    fn http_client(&self) -> Option<&Client> {
        Some(&self.client)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_manga_id_is_last_path_segment() {
        assert_eq!(
            manga_id("https://www.copymanga.org/comic/bluepeiod/").as_deref(),
            Some("bluepeiod")
        );
        assert!(manga_id("not a url").is_none());
    }

    #[test]
    fn test_order_pages_follows_words() {
        let urls = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ordered = order_pages(urls, &[2, 0, 1]);
        assert_eq!(
            ordered,
            vec![Some("b".to_string()), Some("c".to_string()), Some("a".to_string())]
        );
    }

    #[test]
    fn test_order_pages_without_words_keeps_order() {
        let urls = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            order_pages(urls, &[]),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[test]
    fn test_api_headers_webp_toggle() {
        assert_eq!(api_headers(Some("jpg"))["webp"], "0");
        assert_eq!(api_headers(None)["webp"], "1");
        assert_eq!(api_headers(Some("webp"))["platform"], "1");
    }

    #[test]
    fn test_group_count_reads_selected_group() {
        let groups: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"default":{"count":12},"tankobon":{"count":3}}"#).unwrap();
        assert_eq!(group_count(&groups, "default"), 12);
        assert_eq!(group_count(&groups, "tankobon"), 3);
        assert_eq!(group_count(&groups, "missing"), 0);
    }

    #[test]
    fn test_url_completion() {
        let adapter = CopymangaAdapter::new(&SiteConfig::default()).unwrap();
        assert_eq!(
            adapter.url_completion("bluepeiod"),
            "https://www.copymanga.org/comic/bluepeiod"
        );
    }
}
