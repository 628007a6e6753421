// src/feed/featured.rs
//! Bounded "featured" list: server ranking first, local view-count ranking
//! over the detail cache as fallback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use crate::feed::detail_cache::{DetailCache, InFlight};
use crate::feed::source::RankingSource;
use crate::feed::types::DetailRecord;

pub const DEFAULT_FEATURED_LIMIT: usize = 5;

pub struct FeaturedSelector {
    ranking: Option<Arc<dyn RankingSource>>,
    limit: usize,
    // Number of selections in progress.
    loading: AtomicUsize,
}

impl FeaturedSelector {
    pub fn new(ranking: Option<Arc<dyn RankingSource>>, limit: usize) -> Self {
        Self {
            ranking,
            limit: limit.max(1),
            loading: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub async fn select(&self, cache: &DetailCache) -> Vec<DetailRecord> {
        let _loading = InFlight::enter(&self.loading);

        if let Some(ranking) = &self.ranking {
            match ranking.fetch_top_ranked(self.limit).await {
                Ok(ranked) => {
                    let usable: Vec<DetailRecord> = ranked
                        .into_iter()
                        .filter(|d| !d.id.trim().is_empty())
                        .take(self.limit)
                        .collect();
                    if !usable.is_empty() {
                        return usable;
                    }
                    debug!(target: "feed::featured", "ranking source returned nothing usable");
                }
                Err(e) => {
                    warn!(target: "feed::featured", error = ?e, "ranking source unavailable");
                }
            }
            counter!("feed_featured_fallback_total").increment(1);
        }

        rank_by_views(cache.snapshot(), self.limit)
    }
}

/// Descending by views; `sort_by` is stable so ties keep cache insertion order.
pub fn rank_by_views(mut details: Vec<DetailRecord>, limit: usize) -> Vec<DetailRecord> {
    details.sort_by(|a, b| b.views.cmp(&a.views));
    details.truncate(limit);
    details
}
