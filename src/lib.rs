// src/lib.rs
// Public library surface for integration tests and the HTTP binary.

pub mod api;
pub mod comments;
pub mod config;
pub mod error;
pub mod feed;
pub mod providers;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::EngineConfig;
pub use crate::error::FeedError;
pub use crate::feed::types::{DetailRecord, EntityId, Epoch, FeedFilter, SummaryPage, SummaryRecord};
pub use crate::feed::{FeedEngine, PageOutcome};

use std::sync::Arc;

use crate::feed::source::RankingSource;
use crate::providers::http::HttpFeedSource;

/// Build an engine backed by the blog REST API described by `cfg`.
/// The ranking source is the same client unless `ranking_enabled` is off.
pub fn http_engine(cfg: &EngineConfig) -> anyhow::Result<FeedEngine> {
    let source = Arc::new(HttpFeedSource::from_config(cfg)?);
    let ranking: Option<Arc<dyn RankingSource>> = if cfg.ranking_enabled {
        Some(source.clone() as Arc<dyn RankingSource>)
    } else {
        None
    };
    Ok(FeedEngine::new(source, ranking, cfg))
}
