//! Engine-wide download settings.

use crate::archive::{ArchiveMode, DEFAULT_ZIP_LEVEL, MAX_ZIP_LEVEL};

use super::constants::{DEFAULT_BATCH_SIZE, MIN_BATCH_SIZE};

/// Settings that apply to every chapter of a run.
///
/// Construct with struct update syntax over [`DownloadConfig::default`];
/// the engine normalizes out-of-range values when it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Pages fetched concurrently per window.
    pub batch_size: usize,
    /// Folder or archive output.
    pub archive: ArchiveMode,
    /// Deflate level for archives (0-9).
    pub zip_level: u8,
    /// Prefix chapter folder/archive names with the chapter index.
    pub indexed_chapters: bool,
    /// Maximum number of characters kept from the serie title.
    pub max_title_length: Option<usize>,
    /// Suppress the confirmation prompt and informational output.
    pub silence: bool,
    /// Log full error chains.
    pub verbose: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            archive: ArchiveMode::None,
            zip_level: DEFAULT_ZIP_LEVEL,
            indexed_chapters: false,
            max_title_length: None,
            silence: false,
            verbose: false,
        }
    }
}

impl DownloadConfig {
    /// Returns a copy with batch size and zip level clamped to their valid ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.max(MIN_BATCH_SIZE);
        self.zip_level = self.zip_level.min(MAX_ZIP_LEVEL);
        self.max_title_length = self.max_title_length.filter(|max| *max > 0);
        self
    }
}
