// src/feed/mod.rs
//! # Feed Engine
//! Merges paginated summary pages per filter epoch, backfills detail records
//! for known ids, and derives a featured list from whatever is cached.
//!
//! Every page request carries a `PageTicket` (epoch + page). Responses whose
//! epoch is no longer current are dropped on arrival, so there is no need to
//! cancel in-flight requests. Page requests are serialized per epoch.

pub mod detail_cache;
pub mod featured;
pub mod filter;
pub mod source;
pub mod summary_store;
pub mod types;

use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::FeedError;
use crate::feed::detail_cache::{BackfillReport, DetailCache};
use crate::feed::featured::FeaturedSelector;
use crate::feed::filter::{FilterEpochController, PageTicket};
use crate::feed::source::{FeedSource, RankingSource};
use crate::feed::summary_store::SummaryStore;
use crate::feed::types::{DetailRecord, EntityId, Epoch, FeedFilter, SummaryRecord};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_page_requests_total", "Summary page requests issued.");
        describe_counter!("feed_page_errors_total", "Summary page requests that failed.");
        describe_counter!(
            "feed_stale_responses_total",
            "Page responses dropped because their epoch was superseded."
        );
        describe_counter!(
            "feed_detail_requests_total",
            "Detail fetches dispatched by backfill."
        );
        describe_counter!(
            "feed_detail_errors_total",
            "Detail fetches that failed, were missing, or malformed."
        );
        describe_counter!(
            "feed_featured_fallback_total",
            "Featured selections that fell back to local ranking."
        );
        describe_gauge!("feed_epoch", "Current filter epoch.");
        describe_histogram!("feed_page_fetch_ms", "Summary page fetch time in milliseconds.");
    });
}

/// Result of a page-producing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PageOutcome {
    /// The filter was equal by value to the active one; nothing was fetched.
    Unchanged,
    #[serde(rename_all = "camelCase")]
    Applied {
        epoch: Epoch,
        page: u32,
        added: usize,
        has_more: bool,
    },
    /// The response arrived after its epoch was superseded and was dropped.
    Stale { epoch: Epoch, page: u32 },
}

pub struct FeedEngine {
    source: Arc<dyn FeedSource>,
    page_size: u32,
    // Lock order: controller, then summaries.
    controller: Mutex<FilterEpochController>,
    summaries: RwLock<SummaryStore>,
    details: DetailCache,
    featured: FeaturedSelector,
}

impl FeedEngine {
    pub fn new(
        source: Arc<dyn FeedSource>,
        ranking: Option<Arc<dyn RankingSource>>,
        config: &EngineConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            source,
            page_size: config.page_size.max(1),
            controller: Mutex::new(FilterEpochController::new()),
            summaries: RwLock::new(SummaryStore::new()),
            details: DetailCache::new(),
            featured: FeaturedSelector::new(ranking, config.featured_limit),
        }
    }

    /// Apply a filter. A value-equal filter is a no-op; anything else starts a
    /// new epoch, clears the list and loads page 0.
    pub async fn set_filter(&self, filter: FeedFilter) -> Result<PageOutcome, FeedError> {
        let ticket = {
            let mut ctl = self.controller();
            let Some(ticket) = ctl.set_filter(filter.clone()) else {
                return Ok(PageOutcome::Unchanged);
            };
            self.summaries
                .write()
                .expect("summary store lock poisoned")
                .reset();
            ticket
        };

        gauge!("feed_epoch").set(ticket.epoch.value() as f64);
        info!(
            target: "feed",
            epoch = %ticket.epoch,
            query = %filter.query,
            topics = ?filter.topics,
            "filter changed"
        );
        self.fetch_and_apply(ticket, filter).await
    }

    /// Load the next page of the current epoch. After a failed page this
    /// re-requests the same page.
    pub async fn load_next_page(&self) -> Result<PageOutcome, FeedError> {
        let (ticket, filter) = {
            let mut ctl = self.controller();
            let ticket = ctl.next_page()?;
            (ticket, ctl.filter().clone())
        };
        self.fetch_and_apply(ticket, filter).await
    }

    /// Full reset: forget every list entry, detail and reservation, then
    /// reload page 0 of the active filter under a new epoch.
    pub async fn restart(&self) -> Result<PageOutcome, FeedError> {
        let (ticket, filter) = {
            let mut ctl = self.controller();
            let ticket = ctl.restart();
            self.summaries
                .write()
                .expect("summary store lock poisoned")
                .reset();
            self.details.clear();
            (ticket, ctl.filter().clone())
        };
        gauge!("feed_epoch").set(ticket.epoch.value() as f64);
        info!(target: "feed", epoch = %ticket.epoch, "engine restarted");
        self.fetch_and_apply(ticket, filter).await
    }

    async fn fetch_and_apply(
        &self,
        ticket: PageTicket,
        filter: FeedFilter,
    ) -> Result<PageOutcome, FeedError> {
        counter!("feed_page_requests_total").increment(1);
        let t0 = Instant::now();
        let res = self
            .source
            .fetch_summary_page(&filter, ticket.page, self.page_size)
            .await;
        histogram!("feed_page_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let mut ctl = self.controller();
        match res {
            Ok(page) => {
                if !ctl.commit(ticket, page.is_last_page, page.total_count) {
                    return Ok(self.stale(ticket));
                }
                let stats = self
                    .summaries
                    .write()
                    .expect("summary store lock poisoned")
                    .append_page(page.items, ticket.is_first_page());
                debug!(
                    target: "feed",
                    epoch = %ticket.epoch,
                    page = ticket.page,
                    added = stats.added,
                    duplicates = stats.duplicates,
                    malformed = stats.malformed,
                    "page applied"
                );
                Ok(PageOutcome::Applied {
                    epoch: ticket.epoch,
                    page: ticket.page,
                    added: stats.added,
                    has_more: ctl.has_more(),
                })
            }
            Err(e) => {
                if !ctl.fail(ticket, &e) {
                    return Ok(self.stale(ticket));
                }
                counter!("feed_page_errors_total").increment(1);
                warn!(
                    target: "feed",
                    error = ?e,
                    source = self.source.name(),
                    epoch = %ticket.epoch,
                    page = ticket.page,
                    "page fetch failed"
                );
                Err(FeedError::PageFetch {
                    epoch: ticket.epoch,
                    page: ticket.page,
                    source: e,
                })
            }
        }
    }

    fn stale(&self, ticket: PageTicket) -> PageOutcome {
        counter!("feed_stale_responses_total").increment(1);
        debug!(target: "feed", epoch = %ticket.epoch, page = ticket.page, "stale page dropped");
        PageOutcome::Stale {
            epoch: ticket.epoch,
            page: ticket.page,
        }
    }

    /// Hydrate details for `ids`; see [`DetailCache::backfill`].
    pub async fn backfill(&self, ids: &[EntityId]) -> BackfillReport {
        self.details.backfill(self.source.as_ref(), ids).await
    }

    /// Backfill every id currently in the list.
    pub async fn backfill_current(&self) -> BackfillReport {
        let ids = self
            .summaries
            .read()
            .expect("summary store lock poisoned")
            .ids();
        self.backfill(&ids).await
    }

    pub async fn featured(&self) -> Vec<DetailRecord> {
        self.featured.select(&self.details).await
    }

    pub fn current_list(&self) -> Vec<SummaryRecord> {
        self.summaries
            .read()
            .expect("summary store lock poisoned")
            .all()
            .to_vec()
    }

    pub fn detail_for(&self, id: &str) -> Option<DetailRecord> {
        self.details.get(id)
    }

    pub fn is_backfilling(&self) -> bool {
        self.details.is_backfilling()
    }

    pub fn is_loading_featured(&self) -> bool {
        self.featured.is_loading()
    }

    pub fn is_loading_page(&self) -> bool {
        self.controller().is_loading()
    }

    pub fn has_more_pages(&self) -> bool {
        self.controller().has_more()
    }

    pub fn epoch(&self) -> Epoch {
        self.controller().epoch()
    }

    pub fn filter(&self) -> FeedFilter {
        self.controller().filter().clone()
    }

    pub fn total_count(&self) -> u64 {
        self.controller().total_count()
    }

    pub fn last_error(&self) -> Option<String> {
        self.controller().last_error().map(str::to_string)
    }

    fn controller(&self) -> MutexGuard<'_, FilterEpochController> {
        self.controller.lock().expect("filter controller mutex poisoned")
    }
}
