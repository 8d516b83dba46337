//! Zerobyw adapter: scrapes serie and chapter HTML pages.
//!
//! The site rotates its domain, so the base URL is learned from the first URL
//! handed to the adapter (see [`SiteAdapter::detect_base_url`]).
//!
//! Chapter pages distinguish three failure modes by the markup they return:
//! a page without the reader wrapper is not a chapter, a page without the
//! plugin wrapper means the session is missing, and a reader without images
//! means the chapter is gated behind a VIP rank.

use std::sync::{LazyLock, RwLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::HeaderMap;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use crate::metadata::{ComicInfo, MANGA_RIGHT_TO_LEFT};

use super::{
    AdapterOptions, Chapter, PageList, SerieInfo, SiteAdapter, SiteConfig, SiteError,
    build_site_http_client,
};

const SITE_NAME: &str = "zerobyw";
const DEFAULT_BASE_URL: &str = "https://www.zerobyw.com";

const CHAPTERS_SELECTOR: &str = ".uk-grid-collapse .muludiv a";
const READER_SELECTOR: &str = ".wp";
const SESSION_SELECTOR: &str = ".jameson_manhua";
const IMAGES_SELECTOR: &str = ".uk-zjimg img";
const LINK_TAGS_SELECTOR: &str = "div.cl > a.uk-label";
const SPAN_TAGS_SELECTOR: &str = "div.cl > span.uk-label";
const SUMMARY_SELECTOR: &str = "li > div.uk-alert";

#[allow(clippy::expect_used)]
static BASE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^./]+\.[^/]+").expect("base URL regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static AUTHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"zuozhe_name=(.+)$").expect("author regex is valid") // Static pattern, safe to panic
});

/// Adapter for zerobyw mirrors.
#[derive(Debug)]
pub struct ZerobywAdapter {
    client: Client,
    base_url: RwLock<Option<String>>,
}

impl ZerobywAdapter {
    /// Creates the adapter with no base URL; it is learned from the first URL.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the HTTP client cannot be built.
    pub fn new(config: &SiteConfig) -> Result<Self, SiteError> {
        Ok(Self {
            client: build_site_http_client(config, SITE_NAME, HeaderMap::new())?,
            base_url: RwLock::new(None),
        })
    }

    /// Creates the adapter against a specific base URL (mirrors, tests).
    ///
    /// # Errors
    ///
    /// Returns [`SiteError`] if the HTTP client cannot be built.
    pub fn with_base_url(config: &SiteConfig, base_url: &str) -> Result<Self, SiteError> {
        let adapter = Self::new(config)?;
        if let Ok(mut base) = adapter.base_url.write() {
            *base = Some(base_url.trim_end_matches('/').to_string());
        }
        Ok(adapter)
    }

    async fn fetch_html(&self, url: &str) -> Result<String, SiteError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| SiteError::from_reqwest(url, &error))?;
        let body = response
            .text()
            .await
            .map_err(|error| SiteError::from_reqwest(url, &error))?;
        if body.trim().is_empty() {
            return Err(SiteError::request_failed(url, "empty response body"));
        }
        Ok(body)
    }

    fn absolute(&self, uri: &str) -> String {
        super::absolute_page_uri(self.base_url().as_deref(), uri)
    }
}

fn selector(css: &str) -> Result<Selector, SiteError> {
    Selector::parse(css)
        .map_err(|error| SiteError::parse_failed(css, format!("invalid selector: {error}")))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_serie_page(html: &str, url: &str) -> Result<SerieInfo, SiteError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|title| {
            element_text(&title)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
        })
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let chapters: Vec<Chapter> = document
        .select(&selector(CHAPTERS_SELECTOR)?)
        .enumerate()
        .map(|(position, anchor)| {
            let index = u32::try_from(position).unwrap_or(u32::MAX);
            let name = element_text(&anchor);
            let name = if name.is_empty() {
                position.to_string()
            } else {
                name
            };
            let uri = anchor.value().attr("href").map(ToString::to_string);
            Chapter::new(index, name, uri)
        })
        .collect();

    let mut info = ComicInfo {
        serie: Some(title.clone()),
        manga: Some(MANGA_RIGHT_TO_LEFT.to_string()),
        web: Some(url.to_string()),
        count: Some(chapters.len().to_string()),
        ..ComicInfo::default()
    };

    let mut tags = Vec::new();
    for tag in document.select(&selector(LINK_TAGS_SELECTOR)?) {
        let author = tag
            .value()
            .attr("href")
            .and_then(|href| AUTHOR_PATTERN.captures(href))
            .and_then(|captures| captures.get(1))
            .map(|author| author.as_str().to_string());
        match author {
            Some(author) if info.penciller.is_none() => info.penciller = Some(author),
            _ => {
                let text = element_text(&tag);
                if !text.is_empty() {
                    tags.push(text);
                }
            }
        }
    }
    if !tags.is_empty() {
        info.tags = Some(tags.join(","));
    }

    let labels: Vec<String> = document
        .select(&selector(SPAN_TAGS_SELECTOR)?)
        .map(|label| element_text(&label))
        .collect();
    info.language = Some(
        if labels.first().map(String::as_str) == Some("全生肉") {
            "jp"
        } else {
            "zh"
        }
        .to_string(),
    );
    info.location = labels.get(1).filter(|l| !l.is_empty()).cloned();
    info.status = match labels.get(2).map(String::as_str) {
        Some("连载中") => Some("Ongoing".to_string()),
        Some("已完结") => Some("End".to_string()),
        _ => None,
    };

    info.summary = document
        .select(&selector(SUMMARY_SELECTOR)?)
        .next()
        .map(|summary| element_text(&summary))
        .filter(|summary| !summary.is_empty());

    Ok(SerieInfo {
        title,
        chapters,
        info: Some(info),
    })
}

fn parse_chapter_page(html: &str, url: &str) -> Result<Vec<Option<String>>, SiteError> {
    let document = Html::parse_document(html);

    if document.select(&selector(READER_SELECTOR)?).next().is_none() {
        return Err(SiteError::invalid_page(url));
    }
    if document.select(&selector(SESSION_SELECTOR)?).next().is_none() {
        return Err(SiteError::unauthorized(url));
    }

    let images: Vec<Option<String>> = document
        .select(&selector(IMAGES_SELECTOR)?)
        .map(|image| image.value().attr("src").map(ToString::to_string))
        .collect();
    if images.is_empty() {
        return Err(SiteError::forbidden(
            url,
            "this chapter requires a VIP user rank",
        ));
    }
    Ok(images)
}

#[async_trait]
impl SiteAdapter for ZerobywAdapter {
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
        let base = self
            .base_url()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        format!("{base}/plugin.php?id=jameson_manhua&c=index&a=bofang&kuid={shorthand}")
    }

    #[instrument(skip(self), fields(site = SITE_NAME))]
    async fn serie_info(&self, url: &str) -> Result<SerieInfo, SiteError> {
        let url = self.absolute(url);
        let html = self.fetch_html(&url).await?;
        let serie = parse_serie_page(&html, &url)?;
        debug!(title = %serie.title, chapters = serie.chapters.len(), "Parsed serie page");
        Ok(serie)
    }

    #[instrument(skip(self, _adapter_options), fields(site = SITE_NAME))]
    async fn image_list(
        &self,
        chapter_uri: &str,
        _adapter_options: &AdapterOptions,
    ) -> Result<PageList, SiteError> {
        let url = self.absolute(chapter_uri);
        let html = self.fetch_html(&url).await?;
        let pages = parse_chapter_page(&html, &url)?;
        debug!(pages = pages.len(), "Parsed chapter page");
        Ok(pages)
    }

    async fn detect_base_url(&self, url: &str) -> Result<(), SiteError> {
        let Some(found) = BASE_URL_PATTERN.find(url) else {
            debug!(url, "No base URL in input, keeping current base");
            return Ok(());
        };
        if let Ok(mut base) = self.base_url.write() {
            debug!(base = found.as_str(), "Detected base URL");
            *base = Some(found.as_str().to_string());
        }
        Ok(())
    }

    fn base_url(&self) -> Option<String> {
        self.base_url.read().ok().and_then(|base| base.clone())
    }

    fn preferred_presets(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut presets = serde_json::Map::new();
        presets.insert(
            "cookie".to_string(),
            serde_json::Value::String("./zerobyw-cookie.txt".to_string()),
        );
        presets
    }

    fn http_client(&self) -> Option<&Client> {
        Some(&self.client)
    }
}
