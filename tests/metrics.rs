// tests/metrics.rs
mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use blog_feed_engine::telemetry::Metrics;
use blog_feed_engine::{EngineConfig, FeedEngine, FeedFilter};
use common::ScriptedSource;
use tower::ServiceExt;

#[tokio::test]
async fn metrics_endpoint_exposes_feed_series() {
    let metrics = Metrics::init(10, 5).expect("install recorder once per test binary");

    let src = ScriptedSource::new();
    src.page("", 0, &["A"], true);
    let engine = FeedEngine::new(src.clone(), None, &EngineConfig::default());
    engine.set_filter(FeedFilter::default()).await.unwrap();

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = metrics.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("feed_page_size 10"));
    assert!(text.contains("feed_page_requests_total"));
    assert!(text.contains("feed_epoch 1"));
}
