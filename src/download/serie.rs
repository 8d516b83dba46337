//! Serie download orchestration.
//!
//! A serie run resolves the serie once, selects chapters by index, optionally
//! asks for confirmation, then downloads chapters one after another. Chapters
//! that end with failed pages are retried in rounds, with override on, until
//! they come back clean or the retry bound is reached. A chapter that fails
//! outright is attempted once.

use std::fmt::Write as _;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::chapter::ChapterDownloadOptions;
use super::downloader::ComicDownloader;
use super::filename::truncate_title;
use super::progress::{DownloadProgress, ProgressStatus};
use super::retry::{RetryDecision, RetryPolicy};
use crate::site::{Chapter, SerieInfo, SiteError};

/// Errors that end a serie run before any chapter is attempted.
#[derive(Debug, Error)]
pub enum SerieError {
    /// The serie page could not be resolved.
    #[error("could not resolve serie {uri}: {source}")]
    SerieInfo {
        uri: String,
        #[source]
        source: SiteError,
    },
}

/// Options of one serie run.
#[derive(Debug, Clone, Default)]
pub struct SerieDownloadOptions {
    /// First chapter index to download (inclusive).
    pub start: Option<u32>,
    /// Last chapter index to download (inclusive).
    pub end: Option<u32>,
    /// Explicit chapter indices; takes precedence over `start`/`end`.
    pub chapters: Option<Vec<u32>>,
    /// Ask before downloading.
    pub confirm: bool,
    /// Folder name to use instead of the serie title.
    pub rename: Option<String>,
    /// Further attempts allowed per incomplete chapter.
    pub retry: u32,
    /// Write `ComicInfo.xml` with every chapter.
    pub info: bool,
    /// Re-download chapters whose output exists.
    pub override_existing: bool,
}

impl SerieDownloadOptions {
    /// Human-readable description of the selection.
    #[must_use]
    pub fn describe_selection(&self) -> String {
        if let Some(chapters) = &self.chapters {
            let list = chapters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return format!("chapters {list}");
        }
        match (self.start, self.end) {
            (None | Some(0), None) => "the entire serie".to_string(),
            (start, Some(end)) => format!("from {} to {end}", start.unwrap_or(0)),
            (Some(start), None) => format!("from {start} to the end"),
        }
    }

    /// Chapters selected from `chapters`, in ascending index order.
    #[must_use]
    pub fn select<'a>(&self, chapters: &'a [Chapter]) -> Vec<&'a Chapter> {
        let mut selected: Vec<&Chapter> = match &self.chapters {
            Some(indices) => chapters
                .iter()
                .filter(|chapter| indices.contains(&chapter.index))
                .collect(),
            None => {
                let start = self.start.unwrap_or(0);
                let end = self.end.unwrap_or(u32::MAX);
                chapters
                    .iter()
                    .filter(|chapter| (start..=end).contains(&chapter.index))
                    .collect()
            }
        };
        selected.sort_by_key(|chapter| chapter.index);
        selected
    }
}

/// Result of a serie run.
#[derive(Debug, Clone, Default)]
pub struct SerieSummary {
    /// Folder name the chapters were written under.
    pub title: String,
    /// Last progress record of every selected chapter, in index order.
    pub results: Vec<DownloadProgress>,
    /// The user declined the confirmation prompt.
    pub aborted: bool,
}

impl SerieSummary {
    fn count(&self, predicate: impl Fn(&DownloadProgress) -> bool) -> usize {
        self.results.iter().filter(|&p| predicate(p)).count()
    }

    /// Chapters downloaded with every page.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(DownloadProgress::is_clean)
    }

    /// Chapters skipped because their output existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|p| p.status == ProgressStatus::Skipped)
    }

    /// Chapters still failed or missing pages.
    #[must_use]
    pub fn incomplete(&self) -> usize {
        self.count(DownloadProgress::is_incomplete)
    }

    /// First chapter still incomplete, for a resume hint.
    #[must_use]
    pub fn first_incomplete(&self) -> Option<&DownloadProgress> {
        self.results.iter().find(|p| p.is_incomplete())
    }

    /// True when every selected chapter was downloaded whole or skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.aborted && self.incomplete() == 0
    }
}

/// Confirmation prompt shown before a serie download.
#[must_use]
pub fn confirmation_prompt(
    title: &str,
    destination: &std::path::Path,
    options: &SerieDownloadOptions,
) -> String {
    format!(
        "Downloading {title} to {}, {}, Proceed? (Y/n)",
        destination.display(),
        options.describe_selection()
    )
}

impl ComicDownloader {
    /// Resolves serie information, detecting the base URL first.
    ///
    /// # Errors
    ///
    /// Returns [`SerieError::SerieInfo`] when the adapter cannot resolve the serie.
    pub async fn serie_info(&self, uri: &str) -> Result<SerieInfo, SerieError> {
        let to_error = |source| SerieError::SerieInfo {
            uri: uri.to_string(),
            source,
        };
        self.adapter.detect_base_url(uri).await.map_err(to_error)?;
        self.adapter.serie_info(uri).await.map_err(to_error)
    }

    /// Downloads the selected chapters of a serie.
    ///
    /// Chapter failures are part of the summary, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`SerieError`] only when the serie cannot be resolved.
    #[instrument(skip(self, options), fields(site = self.adapter.site_name()))]
    pub async fn download_serie(
        &self,
        uri: &str,
        options: &SerieDownloadOptions,
    ) -> Result<SerieSummary, SerieError> {
        let serie = self.serie_info(uri).await?;
        let title = truncate_title(
            options.rename.as_deref().unwrap_or(&serie.title),
            self.config.max_title_length,
        );
        let mut summary = SerieSummary {
            title: title.clone(),
            ..SerieSummary::default()
        };

        if options.confirm && !self.config.silence {
            let prompt = confirmation_prompt(&title, &self.destination, options);
            if !self.confirm.confirm(&prompt).await {
                info!("Download cancelled");
                summary.aborted = true;
                return Ok(summary);
            }
        }

        let selected = options.select(&serie.chapters);
        info!(title = %title, chapters = selected.len(), "Downloading serie");

        let info = if options.info { serie.info.clone() } else { None };
        let chapter_options = |chapter: &Chapter, override_existing: bool| ChapterDownloadOptions {
            title: Some(title.clone()),
            index: Some(chapter.index),
            override_existing,
            info: info.clone(),
        };

        for &chapter in &selected {
            let progress = self
                .attempt(chapter, &chapter_options(chapter, options.override_existing))
                .await;
            summary.results.push(progress);
        }

        let policy = RetryPolicy::new(options.retry);
        let mut retries_done = 0;
        loop {
            let pending: Vec<(usize, u32)> = summary
                .results
                .iter()
                .enumerate()
                .filter_map(|(position, progress)| match policy.decide(retries_done, progress) {
                    RetryDecision::Retry { attempt } => Some((position, attempt)),
                    RetryDecision::Done | RetryDecision::Exhausted => None,
                })
                .collect();
            if pending.is_empty() {
                break;
            }
            retries_done += 1;
            warn!(
                round = retries_done,
                max = policy.max_retries(),
                chapters = pending.len(),
                "Download completed with failures. Retrying... ({retries_done}/{})",
                policy.max_retries()
            );
            for (position, attempt) in pending {
                let chapter = selected[position];
                debug!(
                    chapter = %chapter.name,
                    attempt,
                    failed_pages = summary.results[position].failed_count,
                    "Retrying chapter"
                );
                summary.results[position] = self.attempt(chapter, &chapter_options(chapter, true)).await;
            }
        }

        log_summary(&summary, &policy, retries_done);
        Ok(summary)
    }

    async fn attempt(&self, chapter: &Chapter, options: &ChapterDownloadOptions) -> DownloadProgress {
        match self
            .download_chapter(&chapter.name, chapter.uri.as_deref(), options, &chapter.adapter_options)
            .await
        {
            Ok(progress) => progress,
            Err(_) => DownloadProgress::new(
                Some(chapter.index),
                self.chapter_display_name(&chapter.name, Some(chapter.index)),
                chapter.uri.as_deref(),
                &chapter.adapter_options,
            ),
        }
    }
}

fn log_summary(summary: &SerieSummary, policy: &RetryPolicy, retries_done: u32) {
    let incomplete = summary.incomplete();
    if incomplete == 0 {
        info!(
            completed = summary.completed(),
            skipped = summary.skipped(),
            "Download Success."
        );
        return;
    }

    let mut names = String::new();
    for progress in summary.results.iter().filter(|p| p.is_incomplete()) {
        if progress.status == ProgressStatus::Failed {
            let _ = write!(names, "\n  - {} (failed)", progress.name);
        } else {
            let _ = write!(names, "\n  - {} ({} pages failed)", progress.name, progress.failed_count);
        }
    }
    if policy.max_retries() > 0 && retries_done >= policy.max_retries() {
        warn!("Maximum number of retries reached, abandoned.");
    }
    warn!(incomplete, "Download completed with failures.{names}");
}
