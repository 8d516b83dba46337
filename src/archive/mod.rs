//! Chapter archives.
//!
//! The chapter engine only needs a sink it can append named entries to and
//! finalize once. [`ZipArchiveSink`] provides that over the `zip` crate for
//! both `.zip` and `.cbz` outputs.

mod zip_sink;

pub use zip_sink::{PART_SUFFIX, ZipArchiveSink, part_path};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default Deflate level for chapter archives.
pub const DEFAULT_ZIP_LEVEL: u8 = 5;

/// Highest accepted Deflate level.
pub const MAX_ZIP_LEVEL: u8 = 9;

/// How a chapter is materialized on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    /// Loose files in a chapter folder.
    #[default]
    None,
    /// A `.zip` archive per chapter.
    Zip,
    /// A `.cbz` archive per chapter.
    Cbz,
}

impl ArchiveMode {
    /// File extension of the archive, `None` for folder output.
    #[must_use]
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Zip => Some("zip"),
            Self::Cbz => Some("cbz"),
        }
    }

    /// Returns true when chapters are written as archives.
    #[must_use]
    pub fn is_archive(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for ArchiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().unwrap_or("none"))
    }
}

impl FromStr for ArchiveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "false" => Ok(Self::None),
            "zip" | "true" => Ok(Self::Zip),
            "cbz" => Ok(Self::Cbz),
            other => Err(format!("unknown archive format '{other}' (expected zip or cbz)")),
        }
    }
}

/// Errors produced by archive sinks.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error creating, renaming or removing the archive file.
    #[error("archive IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zip writer rejected an entry or could not finish.
    #[error("zip error in {path}: {reason}")]
    Zip { path: PathBuf, reason: String },

    /// An entry was appended after the archive was finalized or aborted.
    #[error("archive {path} is already closed")]
    Closed { path: PathBuf },
}

impl ArchiveError {
    /// Creates a `Zip` error.
    #[must_use]
    pub fn zip(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Zip {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Destination for the entries of one chapter archive.
///
/// `append` may be called concurrently from the tasks of one download window.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Adds one named entry.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the entry cannot be written or the sink is closed.
    async fn append(&self, name: &str, bytes: Vec<u8>) -> Result<(), ArchiveError>;

    /// Completes the archive. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the archive cannot be completed.
    async fn finalize(&self) -> Result<(), ArchiveError>;

    /// Drops the archive without completing it, removing any partial file.
    /// Also valid after a failed [`finalize`](Self::finalize).
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the partial file cannot be removed.
    async fn abort(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}
