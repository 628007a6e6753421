// src/feed/source.rs
use anyhow::Result;

use crate::feed::types::{DetailRecord, FeedFilter, SummaryPage};

/// Single-shot REST collaborator backing the feed.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_summary_page(
        &self,
        filter: &FeedFilter,
        page: u32,
        page_size: u32,
    ) -> Result<SummaryPage>;

    /// `Ok(None)` means the entity does not exist.
    async fn fetch_detail(&self, id: &str) -> Result<Option<DetailRecord>>;

    fn name(&self) -> &'static str;
}

/// Optional server-side popularity ranking.
#[async_trait::async_trait]
pub trait RankingSource: Send + Sync {
    async fn fetch_top_ranked(&self, n: usize) -> Result<Vec<DetailRecord>>;
}
