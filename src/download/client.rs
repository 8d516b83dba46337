//! Single-page fetching.
//!
//! [`PageFetcher`] is the seam the batch downloader drives; [`HttpImageFetcher`]
//! is the reqwest implementation used at runtime. A fetch never retries: a
//! failed page is reported once and counted by the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::error::FetchError;
use super::filename::{
    DEFAULT_IMAGE_EXTENSION, extension_from_content_type, extension_from_url, filename_from_url,
    sanitize_path_segment,
};
use crate::archive::ArchiveSink;
use crate::user_agent;

/// Where fetched pages go.
#[derive(Clone)]
pub enum FetchTarget {
    /// Loose files inside a chapter directory.
    Directory(PathBuf),
    /// Entries of an open chapter archive.
    Archive(Arc<dyn ArchiveSink>),
}

impl std::fmt::Debug for FetchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(path) => f.debug_tuple("Directory").field(path).finish(),
            Self::Archive(_) => f.write_str("Archive(..)"),
        }
    }
}

/// Per-page naming options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// File stem to use instead of the URI's trailing segment.
    pub image_name: Option<String>,
}

impl FetchOptions {
    /// Names the page `<image_name>.<ext>`.
    #[must_use]
    pub fn named(image_name: impl Into<String>) -> Self {
        Self {
            image_name: Some(image_name.into()),
        }
    }
}

/// Fetches one page into a [`FetchTarget`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Downloads `page_uri` and stores it, returning the stored file name.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on request, naming, filesystem or archive failure.
    async fn fetch(
        &self,
        target: &FetchTarget,
        page_uri: &str,
        options: &FetchOptions,
    ) -> Result<String, FetchError>;
}

/// Page fetcher over a shared reqwest client.
///
/// The client is normally the site adapter's, so cookies and site headers
/// apply to image requests as well.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new(
            Client::builder()
                .user_agent(user_agent::default_user_agent())
                .build()
                .unwrap_or_default(),
        )
    }
}

impl HttpImageFetcher {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::http_status(url, response.status().as_u16()));
        }
        Ok(response)
    }
}

/// Resolves `<stem>.<ext>` for a page.
///
/// The extension comes from the content type, then the URI, then `jpg`.
fn resolve_filename(
    url: &str,
    content_type: Option<&str>,
    options: &FetchOptions,
) -> Result<String, FetchError> {
    let extension = content_type
        .and_then(extension_from_content_type)
        .map(ToString::to_string)
        .or_else(|| extension_from_url(url))
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string());

    match options.image_name.as_deref().filter(|name| !name.is_empty()) {
        Some(stem) => Ok(format!("{}.{extension}", sanitize_path_segment(stem))),
        None => filename_from_url(url).ok_or_else(|| FetchError::filename_undetectable(url)),
    }
}

#[async_trait]
impl PageFetcher for HttpImageFetcher {
    #[instrument(skip(self, target, options), fields(image_name = ?options.image_name))]
    async fn fetch(
        &self,
        target: &FetchTarget,
        page_uri: &str,
        options: &FetchOptions,
    ) -> Result<String, FetchError> {
        if page_uri.trim().is_empty() || Url::parse(page_uri).is_err() {
            return Err(FetchError::invalid_url(page_uri));
        }

        let response = self.send_request(page_uri).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let filename = resolve_filename(page_uri, content_type.as_deref(), options)?;

        match target {
            FetchTarget::Directory(dir) => {
                let path = dir.join(&filename);
                let written = stream_to_file(response, page_uri, &path).await;
                match written {
                    Ok(0) => {
                        let _ = tokio::fs::remove_file(&path).await;
                        return Err(FetchError::empty_body(page_uri));
                    }
                    Ok(bytes) => debug!(path = %path.display(), bytes, "page written"),
                    Err(error) => {
                        debug!(path = %path.display(), "cleaning up partial page after error");
                        let _ = tokio::fs::remove_file(&path).await;
                        return Err(error);
                    }
                }
            }
            FetchTarget::Archive(sink) => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::network(page_uri, e))?;
                if bytes.is_empty() {
                    return Err(FetchError::empty_body(page_uri));
                }
                let len = bytes.len();
                sink.append(&filename, bytes.to_vec())
                    .await
                    .map_err(|e| FetchError::archive(filename.clone(), e))?;
                debug!(entry = %filename, bytes = len, "page archived");
            }
        }

        Ok(filename)
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let file = File::create(file_path)
        .await
        .map_err(|e| FetchError::io(file_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}
