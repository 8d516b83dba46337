//! Windowed page downloads.
//!
//! A chapter's pages are split into fixed-size windows. Every page of a window
//! is fetched concurrently and the window settles completely before the next
//! one starts, so at most `concurrency` requests are in flight. A failing page
//! never cancels its siblings.

use futures_util::future::join_all;
use tracing::{debug, instrument, warn};

use super::client::{FetchOptions, FetchTarget, PageFetcher};
use super::constants::MIN_BATCH_SIZE;
use super::error::FetchError;
use super::filename::format_image_name;

/// Downloads `pages` in windows of `concurrency`, returning the number of failures.
///
/// The page at position `i` is stored as `format_image_name(offset + i + 1)`,
/// so file names follow page order regardless of completion order. `None`
/// entries count as failures without a request.
#[instrument(skip(fetcher, target, pages), fields(pages = pages.len()))]
pub async fn download_segmented(
    fetcher: &dyn PageFetcher,
    target: &FetchTarget,
    pages: &[Option<String>],
    concurrency: usize,
    offset: usize,
) -> usize {
    let window = concurrency.max(MIN_BATCH_SIZE);
    let mut failed = 0;

    for (window_index, chunk) in pages.chunks(window).enumerate() {
        let start = offset + window_index * window;
        let fetches = chunk.iter().enumerate().map(|(i, page)| {
            let image_name = format_image_name(start + i + 1);
            async move {
                let Some(uri) = page.as_deref().filter(|uri| !uri.trim().is_empty()) else {
                    return Err(FetchError::invalid_url(""));
                };
                fetcher
                    .fetch(target, uri, &FetchOptions::named(image_name))
                    .await
            }
        });

        let results = join_all(fetches).await;
        let window_failures = results
            .iter()
            .enumerate()
            .filter_map(|(i, result)| result.as_ref().err().map(|error| (i, error)))
            .inspect(|(i, error)| {
                warn!(page = start + i + 1, error = %error, "Page not downloaded");
            })
            .count();

        debug!(
            window = window_index,
            size = chunk.len(),
            failed = window_failures,
            "Window settled"
        );
        failed += window_failures;
    }

    failed
}
