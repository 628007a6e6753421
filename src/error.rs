//! Errors surfaced to callers of the feed engine.

use thiserror::Error;

use crate::feed::types::Epoch;

/// Only page-level failures reach the caller; detail and ranking failures
/// are absorbed inside the engine.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The last committed page was flagged as the final one.
    #[error("no more pages for the current filter")]
    NoMorePages,

    /// A page request for the current epoch has not settled yet.
    #[error("page {page} is still loading")]
    PageInFlight { page: u32 },

    /// The summary-page fetch failed; the page index was not advanced.
    #[error("fetching page {page} (epoch {epoch}) failed: {source:#}")]
    PageFetch {
        epoch: Epoch,
        page: u32,
        #[source]
        source: anyhow::Error,
    },
}
