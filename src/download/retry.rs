//! Chapter-level retry policy.
//!
//! Retries are whole-chapter re-downloads with override on. Page fetches are
//! never retried individually; a chapter with any failed page is retried as a
//! unit until it comes back clean or the bound is reached.

use super::progress::DownloadProgress;

/// Decision for a chapter after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The chapter needs no further attempt, or another one cannot help.
    Done,
    /// Attempt the chapter again.
    Retry {
        /// Which retry this will be (1-indexed).
        attempt: u32,
    },
    /// The chapter is still incomplete and the bound is reached.
    Exhausted,
}

/// Bound on chapter re-download attempts.
///
/// `0` disables retries; `n` allows up to `n` further attempts per chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` further attempts per chapter.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the retry bound.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides what to do after `retries_done` retries produced `progress`.
    #[must_use]
    pub fn decide(&self, retries_done: u32, progress: &DownloadProgress) -> RetryDecision {
        if !progress.needs_retry() {
            return RetryDecision::Done;
        }
        if self.max_retries == 0 || retries_done >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        RetryDecision::Retry {
            attempt: retries_done + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::progress::ProgressStatus;
    use crate::site::AdapterOptions;

    fn progress(status: ProgressStatus, failed_count: usize) -> DownloadProgress {
        DownloadProgress::new(Some(0), "Ch", None, &AdapterOptions::new())
            .with_status(status, failed_count)
    }

    #[test]
    fn test_clean_chapter_is_done() {
        let policy = RetryPolicy::new(3);
        assert_eq!(
            policy.decide(0, &progress(ProgressStatus::Completed, 0)),
            RetryDecision::Done
        );
    }

    #[test]
    fn test_incomplete_chapter_retries_until_bound() {
        let policy = RetryPolicy::new(2);
        let failed = progress(ProgressStatus::Completed, 4);
        assert_eq!(policy.decide(0, &failed), RetryDecision::Retry { attempt: 1 });
        assert_eq!(policy.decide(1, &failed), RetryDecision::Retry { attempt: 2 });
        assert_eq!(policy.decide(2, &failed), RetryDecision::Exhausted);
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let policy = RetryPolicy::disabled();
        assert_eq!(
            policy.decide(0, &progress(ProgressStatus::Completed, 1)),
            RetryDecision::Exhausted
        );
        assert_eq!(policy.max_retries(), 0);
    }

    #[test]
    fn test_failed_chapter_without_lost_pages_is_not_retried() {
        let policy = RetryPolicy::new(2);
        assert_eq!(
            policy.decide(0, &progress(ProgressStatus::Failed, 0)),
            RetryDecision::Done
        );
    }
}
