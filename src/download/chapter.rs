//! Chapter download engine.
//!
//! One chapter attempt runs these steps in order:
//!
//! 1. Reject a missing chapter URI.
//! 2. Learn the adapter's base URL if it has none yet.
//! 3. Skip when the output already exists and override is off.
//! 4. Create the output folder or open the archive (`.part`).
//! 5. Resolve the page list; abandon the partial output if that fails.
//! 6. Fetch pages window by window, counting failures.
//! 7. Write `ComicInfo.xml` when metadata is given.
//! 8. Finalize the archive and report `completed`.
//!
//! Page failures never fail the chapter. Every other error is reported to the
//! observer as `failed` before it is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::batch::download_segmented;
use super::client::FetchTarget;
use super::downloader::ComicDownloader;
use super::filename::sanitize_path_segment;
use super::progress::{DownloadProgress, ProgressStatus};
use crate::archive::{ArchiveError, ArchiveSink, ZipArchiveSink};
use crate::metadata::{COMIC_INFO_FILENAME, ComicInfo};
use crate::site::{AdapterOptions, SiteError, absolute_page_uri};

/// Errors that end a chapter attempt.
#[derive(Debug, Error)]
pub enum ChapterError {
    /// The chapter has no URI to resolve pages from.
    #[error("chapter '{name}' has no URI")]
    InvalidChapterUri {
        /// Chapter display name.
        name: String,
    },

    /// The adapter returned no pages.
    #[error("no pages found for chapter '{name}' ({uri})")]
    PageListUnavailable {
        /// Chapter display name.
        name: String,
        /// Chapter URI.
        uri: String,
    },

    /// The adapter failed to resolve the chapter.
    #[error("site error for chapter '{name}': {source}")]
    Site {
        /// Chapter display name.
        name: String,
        /// Underlying adapter error.
        #[source]
        source: SiteError,
    },

    /// A folder or file could not be created or written.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The chapter archive could not be written or finalized.
    #[error("archive error for chapter '{name}': {source}")]
    Archive {
        /// Chapter display name.
        name: String,
        /// Underlying archive error.
        #[source]
        source: ArchiveError,
    },
}

impl ChapterError {
    fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Per-chapter options.
#[derive(Debug, Clone, Default)]
pub struct ChapterDownloadOptions {
    /// Serie folder under the destination; `None` writes directly into it.
    pub title: Option<String>,
    /// Chapter index, used for indexed naming and progress records.
    pub index: Option<u32>,
    /// Re-download even if the output exists.
    pub override_existing: bool,
    /// Metadata written as `ComicInfo.xml` with the pages.
    pub info: Option<ComicInfo>,
}

/// Output of one chapter while it is being written.
enum ChapterOutput {
    Directory { path: PathBuf, created: bool },
    Archive(Arc<ZipArchiveSink>),
}

impl ChapterOutput {
    fn target(&self) -> FetchTarget {
        match self {
            Self::Directory { path, .. } => FetchTarget::Directory(path.clone()),
            Self::Archive(sink) => FetchTarget::Archive(Arc::clone(sink) as Arc<dyn ArchiveSink>),
        }
    }

    /// Removes what was created for an abandoned attempt.
    async fn discard(&self) {
        match self {
            Self::Directory { path, created: true } => {
                // Only an empty folder is removed; pages from a partial attempt stay.
                if let Err(error) = tokio::fs::remove_dir(path).await {
                    debug!(path = %path.display(), error = %error, "Chapter folder kept");
                }
            }
            Self::Directory { .. } => {}
            Self::Archive(sink) => {
                if let Err(error) = sink.abort().await {
                    warn!(error = %error, "Could not remove partial archive");
                }
            }
        }
    }
}

impl ComicDownloader {
    /// Chapter display name: `"<index> <name>"` with indexed naming, else `name`.
    #[must_use]
    pub fn chapter_display_name(&self, name: &str, index: Option<u32>) -> String {
        match index {
            Some(index) if self.config.indexed_chapters => format!("{index} {name}"),
            _ => name.to_string(),
        }
    }

    /// Final output path of a chapter (folder, or archive file).
    #[must_use]
    pub fn chapter_output_path(&self, title: Option<&str>, display_name: &str) -> PathBuf {
        let serie_dir = self.serie_dir(title);
        let base = sanitize_path_segment(display_name);
        match self.config.archive.extension() {
            Some(ext) => serie_dir.join(format!("{base}.{ext}")),
            None => serie_dir.join(base),
        }
    }

    fn serie_dir(&self, title: Option<&str>) -> PathBuf {
        match title.filter(|title| !title.is_empty()) {
            Some(title) => self.destination.join(sanitize_path_segment(title)),
            None => self.destination.clone(),
        }
    }

    /// Downloads one chapter.
    ///
    /// Returns the terminal progress record, which is also sent to the
    /// observer. Pages that fail are counted in `failed_count`.
    ///
    /// # Errors
    ///
    /// Returns [`ChapterError`] when the chapter cannot be attempted or its
    /// output cannot be committed. A `failed` record has been emitted first.
    #[instrument(skip(self, options, adapter_options), fields(index = ?options.index, site = self.adapter.site_name()))]
    pub async fn download_chapter(
        &self,
        name: &str,
        uri: Option<&str>,
        options: &ChapterDownloadOptions,
        adapter_options: &AdapterOptions,
    ) -> Result<DownloadProgress, ChapterError> {
        let display_name = self.chapter_display_name(name, options.index);
        let uri = uri.map(str::trim).filter(|uri| !uri.is_empty());
        let progress = DownloadProgress::new(options.index, &display_name, uri, adapter_options);
        self.notify_start(options.index, &display_name);

        let Some(uri) = uri else {
            return Err(self.fail(
                progress,
                ChapterError::InvalidChapterUri {
                    name: display_name,
                },
            ));
        };

        if self.adapter.base_url().is_none()
            && let Err(source) = self.adapter.detect_base_url(uri).await
        {
            return Err(self.fail(
                progress,
                ChapterError::Site {
                    name: display_name,
                    source,
                },
            ));
        }

        let output_path = self.chapter_output_path(options.title.as_deref(), &display_name);
        if !options.override_existing && tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            info!(path = %output_path.display(), "Chapter already downloaded, skipping");
            let skipped = progress.with_status(ProgressStatus::Skipped, 0);
            self.notify(&skipped);
            return Ok(skipped);
        }

        let output = match self.open_output(options.title.as_deref(), &output_path).await {
            Ok(output) => output,
            Err(error) => return Err(self.fail(progress, error)),
        };

        let pages = match self.adapter.image_list(uri, adapter_options).await {
            Ok(pages) if pages.is_empty() => {
                output.discard().await;
                return Err(self.fail(
                    progress,
                    ChapterError::PageListUnavailable {
                        name: display_name,
                        uri: uri.to_string(),
                    },
                ));
            }
            Ok(pages) => pages,
            Err(source) => {
                output.discard().await;
                return Err(self.fail(
                    progress,
                    ChapterError::Site {
                        name: display_name,
                        source,
                    },
                ));
            }
        };

        let base_url = self.adapter.base_url();
        let pages: Vec<Option<String>> = pages
            .into_iter()
            .map(|page| {
                page.filter(|uri| !uri.trim().is_empty())
                    .map(|uri| absolute_page_uri(base_url.as_deref(), &uri))
            })
            .collect();
        debug!(pages = pages.len(), "Resolved page list");

        let target = output.target();
        let failed_count =
            download_segmented(self.fetcher.as_ref(), &target, &pages, self.config.batch_size, 0)
                .await;
        if failed_count > 0 {
            warn!(failed = failed_count, total = pages.len(), "Chapter has pages not downloaded");
        }

        if let Err(error) = self.commit(&output, &display_name, options.info.as_ref()).await {
            output.discard().await;
            return Err(self.fail(progress, error));
        }

        info!(name = %display_name, failed = failed_count, "Saved chapter");
        let completed = progress.with_status(ProgressStatus::Completed, failed_count);
        self.notify(&completed);
        Ok(completed)
    }

    async fn open_output(
        &self,
        title: Option<&str>,
        output_path: &Path,
    ) -> Result<ChapterOutput, ChapterError> {
        let serie_dir = self.serie_dir(title);
        tokio::fs::create_dir_all(&serie_dir)
            .await
            .map_err(|e| ChapterError::filesystem(&serie_dir, e))?;

        if self.config.archive.is_archive() {
            let sink = ZipArchiveSink::create(output_path, self.config.zip_level)
                .await
                .map_err(|source| ChapterError::Archive {
                    name: output_path.display().to_string(),
                    source,
                })?;
            return Ok(ChapterOutput::Archive(Arc::new(sink)));
        }

        let existed = tokio::fs::try_exists(output_path).await.unwrap_or(false);
        tokio::fs::create_dir_all(output_path)
            .await
            .map_err(|e| ChapterError::filesystem(output_path, e))?;
        Ok(ChapterOutput::Directory {
            path: output_path.to_path_buf(),
            created: !existed,
        })
    }

    async fn commit(
        &self,
        output: &ChapterOutput,
        display_name: &str,
        info: Option<&ComicInfo>,
    ) -> Result<(), ChapterError> {
        let archive_error = |source| ChapterError::Archive {
            name: display_name.to_string(),
            source,
        };
        match output {
            ChapterOutput::Directory { path, .. } => {
                if let Some(info) = info {
                    let xml_path = path.join(COMIC_INFO_FILENAME);
                    tokio::fs::write(&xml_path, info.to_xml())
                        .await
                        .map_err(|e| ChapterError::filesystem(&xml_path, e))?;
                }
            }
            ChapterOutput::Archive(sink) => {
                if let Some(info) = info {
                    sink.append(COMIC_INFO_FILENAME, info.to_xml().into_bytes())
                        .await
                        .map_err(archive_error)?;
                }
                sink.finalize().await.map_err(archive_error)?;
            }
        }
        Ok(())
    }

    fn fail(&self, progress: DownloadProgress, error: ChapterError) -> ChapterError {
        warn!(name = %progress.name, error = %error, "Chapter failed");
        self.notify(&progress.with_status(ProgressStatus::Failed, 0));
        error
    }
}
