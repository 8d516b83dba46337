//! Constants for the download module (batch sizing).

/// Default number of pages fetched concurrently per window.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Smallest accepted batch size; lower values are raised to it.
pub const MIN_BATCH_SIZE: usize = 1;
