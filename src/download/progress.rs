//! Per-chapter progress records and observers.
//!
//! Every chapter attempt ends in exactly one [`DownloadProgress`] handed to the
//! observer, after the chapter's output has been committed (or abandoned).

use std::fmt;

use serde::Serialize;

use crate::site::AdapterOptions;

/// Terminal state of one chapter attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Pages were fetched; some may still have failed.
    Completed,
    /// The chapter could not be attempted or committed.
    Failed,
    /// The output already existed and override was off.
    Skipped,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        })
    }
}

/// Outcome of one chapter attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadProgress {
    pub index: Option<u32>,
    /// Display name after indexed naming.
    pub name: String,
    pub uri: Option<String>,
    pub status: ProgressStatus,
    /// Pages that could not be fetched.
    pub failed_count: usize,
    /// Options the adapter attached to the chapter.
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub adapter_options: AdapterOptions,
}

impl DownloadProgress {
    pub(crate) fn new(
        index: Option<u32>,
        name: impl Into<String>,
        uri: Option<&str>,
        adapter_options: &AdapterOptions,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            uri: uri.map(ToString::to_string),
            status: ProgressStatus::Failed,
            failed_count: 0,
            adapter_options: adapter_options.clone(),
        }
    }

    pub(crate) fn with_status(mut self, status: ProgressStatus, failed_count: usize) -> Self {
        self.status = status;
        self.failed_count = failed_count;
        self
    }

    /// True when pages were lost and a fresh attempt may recover them.
    ///
    /// A chapter that failed outright (no URI, unreadable page list, commit
    /// error) is not retried.
    #[must_use]
    pub fn needs_retry(&self) -> bool {
        self.failed_count > 0
    }

    /// True when the chapter failed or is missing pages.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.status == ProgressStatus::Failed || self.failed_count > 0
    }

    /// True when every page was fetched.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.status == ProgressStatus::Completed && self.failed_count == 0
    }
}

/// Receives chapter lifecycle events.
pub trait ProgressObserver: Send + Sync {
    /// Called before a chapter attempt touches the disk or network.
    fn on_start(&self, _index: Option<u32>, _name: &str) {}

    /// Called exactly once per chapter attempt with its terminal record.
    fn on_progress(&self, progress: &DownloadProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&DownloadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &DownloadProgress) {
        self(progress);
    }
}
