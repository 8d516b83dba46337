//! Download orchestration engine.
//!
//! Layers, leaves first:
//!
//! - [`PageFetcher`] retrieves one page into a folder or an archive sink.
//! - [`download_segmented`] drives page fetches in bounded windows.
//! - [`ComicDownloader::download_chapter`] resolves and commits one chapter.
//! - [`ComicDownloader::download_serie`] selects chapters, runs them in order
//!   and retries incomplete ones.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use comic_dl_core::download::{ComicDownloader, DownloadConfig, SerieDownloadOptions};
//! use comic_dl_core::site::{SiteConfig, ZerobywAdapter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = Arc::new(ZerobywAdapter::new(&SiteConfig::default())?);
//! let downloader = ComicDownloader::new(adapter, "./comics", DownloadConfig::default());
//! let summary = downloader
//!     .download_serie("https://zerobyw.example/manhua/123", &SerieDownloadOptions::default())
//!     .await?;
//! println!("{} chapters complete", summary.completed());
//! # Ok(())
//! # }
//! ```

mod batch;
mod chapter;
mod client;
mod config;
mod constants;
mod downloader;
mod error;
mod filename;
mod progress;
mod retry;
mod serie;

pub use batch::download_segmented;
pub use chapter::{ChapterDownloadOptions, ChapterError};
pub use client::{FetchOptions, FetchTarget, HttpImageFetcher, PageFetcher};
pub use config::DownloadConfig;
pub use constants::{DEFAULT_BATCH_SIZE, MIN_BATCH_SIZE};
pub use downloader::{AutoConfirm, ComicDownloader, Confirm};
pub use error::FetchError;
pub use filename::{
    DEFAULT_IMAGE_EXTENSION, extension_from_content_type, extension_from_url, filename_from_url,
    format_image_name, sanitize_path_segment, truncate_title,
};
pub use progress::{DownloadProgress, ProgressObserver, ProgressStatus};
pub use retry::{RetryDecision, RetryPolicy};
pub use serie::{SerieDownloadOptions, SerieError, SerieSummary, confirmation_prompt};
