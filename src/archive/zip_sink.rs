//! Zip-backed archive sink.
//!
//! Entries are written to `<final>.part` and the file is renamed onto its
//! final name only when the archive is finalized. The `zip` writer is
//! synchronous, so every write runs on the blocking pool behind a mutex.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, instrument};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{ArchiveError, ArchiveSink, MAX_ZIP_LEVEL};

/// Suffix of archives that are still being written.
pub const PART_SUFFIX: &str = "part";

type SharedWriter = Arc<Mutex<Option<ZipWriter<File>>>>;

/// Archive sink writing a Deflate-compressed zip file.
#[derive(Clone)]
pub struct ZipArchiveSink {
    final_path: PathBuf,
    part_path: PathBuf,
    level: u8,
    writer: SharedWriter,
}

impl std::fmt::Debug for ZipArchiveSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchiveSink")
            .field("final_path", &self.final_path)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Returns the in-progress path for an archive path.
#[must_use]
pub fn part_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".");
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

impl ZipArchiveSink {
    /// Creates `<final_path>.part` and opens a zip writer on it.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the file cannot be created.
    #[instrument(skip_all, fields(path = %final_path.display()))]
    pub async fn create(final_path: &Path, level: u8) -> Result<Self, ArchiveError> {
        let part = part_path(final_path);
        let file = tokio::fs::File::create(&part)
            .await
            .map_err(|source| ArchiveError::Io {
                path: part.clone(),
                source,
            })?
            .into_std()
            .await;
        debug!(part = %part.display(), "Opened archive");
        Ok(Self {
            final_path: final_path.to_path_buf(),
            part_path: part,
            level: level.min(MAX_ZIP_LEVEL),
            writer: Arc::new(Mutex::new(Some(ZipWriter::new(file)))),
        })
    }

    /// Final archive path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.final_path
    }

    fn options(&self) -> FileOptions {
        FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i32::from(self.level)))
    }

    async fn with_writer<T, F>(&self, op: F) -> Result<T, ArchiveError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Option<ZipWriter<File>>, &Path) -> Result<T, ArchiveError> + Send + 'static,
    {
        let writer = Arc::clone(&self.writer);
        let part = self.part_path.clone();
        let join_path = part.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = writer
                .lock()
                .map_err(|_| ArchiveError::zip(&part, "archive writer lock poisoned"))?;
            op(&mut guard, &part)
        })
        .await
        .map_err(|error| ArchiveError::zip(join_path, format!("archive task failed: {error}")))?
    }
}

#[async_trait]
impl ArchiveSink for ZipArchiveSink {
    async fn append(&self, name: &str, bytes: Vec<u8>) -> Result<(), ArchiveError> {
        let options = self.options();
        let name = name.to_string();
        self.with_writer(move |slot, part| {
            let writer = slot.as_mut().ok_or_else(|| ArchiveError::Closed {
                path: part.to_path_buf(),
            })?;
            writer
                .start_file(name.as_str(), options)
                .map_err(|error| ArchiveError::zip(part, error.to_string()))?;
            writer.write_all(&bytes).map_err(|source| ArchiveError::Io {
                path: part.to_path_buf(),
                source,
            })
        })
        .await
    }

    async fn finalize(&self) -> Result<(), ArchiveError> {
        let final_path = self.final_path.clone();
        self.with_writer(move |slot, part| {
            let Some(mut writer) = slot.take() else {
                return Ok(());
            };
            writer
                .finish()
                .map_err(|error| ArchiveError::zip(part, error.to_string()))?;
            std::fs::rename(part, &final_path).map_err(|source| ArchiveError::Io {
                path: final_path.clone(),
                source,
            })?;
            debug!(path = %final_path.display(), "Archive finalized");
            Ok(())
        })
        .await
    }

    async fn abort(&self) -> Result<(), ArchiveError> {
        self.with_writer(|slot, part| {
            // A failed finalize has already released the writer but left the file.
            drop(slot.take());
            match std::fs::remove_file(part) {
                Ok(()) => Ok(()),
                Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(ArchiveError::Io {
                    path: part.to_path_buf(),
                    source,
                }),
            }
        })
        .await
    }
}
