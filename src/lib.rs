//! comic-dl core library
//!
//! Downloads comic series from pluggable sites, chapter by chapter, into
//! folders or zip/cbz archives with optional `ComicInfo.xml` metadata.
//!
//! # Architecture
//!
//! - [`site`] - Site adapter trait, registry and the bundled adapters
//! - [`download`] - Page fetching, windowed batches, chapter and serie engines
//! - [`archive`] - Archive sinks for zip/cbz output
//! - [`metadata`] - `ComicInfo.xml` records

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod download;
pub mod metadata;
pub mod site;

pub(crate) mod user_agent;

// Re-export commonly used types
pub use archive::{ArchiveError, ArchiveMode, ArchiveSink, ZipArchiveSink};
pub use download::{
    ChapterDownloadOptions, ChapterError, ComicDownloader, Confirm, DownloadConfig,
    DownloadProgress, FetchError, HttpImageFetcher, PageFetcher, ProgressObserver, ProgressStatus,
    RetryPolicy, SerieDownloadOptions, SerieError, SerieSummary,
};
pub use metadata::ComicInfo;
pub use site::{
    Chapter, SerieInfo, SiteAdapter, SiteConfig, SiteError, SiteRegistry,
    build_default_site_registry,
};
