//! Blog Feed Service — Binary Entrypoint
//! Boots the Axum HTTP server around a `FeedEngine` backed by the blog REST API.

use std::sync::Arc;

use blog_feed_engine::api::{create_router, AppState};
use blog_feed_engine::telemetry::Metrics;
use blog_feed_engine::{http_engine, EngineConfig};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - FEED_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("FEED_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("blog_feed_engine=info,warn"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = EngineConfig::load_default()?;
    info!(
        base = %cfg.api_base_url,
        page_size = cfg.page_size,
        featured_limit = cfg.featured_limit,
        ranking = cfg.ranking_enabled,
        "feed config loaded"
    );

    let metrics = Metrics::init(cfg.page_size, cfg.featured_limit)?;
    let engine = Arc::new(http_engine(&cfg)?);

    let router = create_router(AppState { engine }).merge(metrics.router());

    Ok(router.into())
}
