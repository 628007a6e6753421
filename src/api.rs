//! HTTP surface over the feed engine, consumed by the listing UI.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::comments::{self, CommentThread};
use crate::error::FeedError;
use crate::feed::types::{DetailRecord, Epoch, FeedFilter, SummaryRecord};
use crate::feed::{FeedEngine, PageOutcome};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FeedEngine>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feed", get(feed_view))
        .route("/feed/filter", post(set_filter))
        .route("/feed/next", post(next_page))
        .route("/feed/details/{id}", get(detail))
        .route("/featured", get(featured))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct FilterReq {
    #[serde(default)]
    query: String,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedView {
    epoch: Epoch,
    query: String,
    topics: Vec<String>,
    items: Vec<SummaryRecord>,
    has_more: bool,
    total_count: u64,
    is_loading: bool,
    is_backfilling: bool,
    last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<PageOutcome>,
}

impl FeedView {
    fn of(engine: &FeedEngine, outcome: Option<PageOutcome>) -> Self {
        let filter = engine.filter();
        Self {
            epoch: engine.epoch(),
            query: filter.query,
            topics: filter.topics,
            items: engine.current_list(),
            has_more: engine.has_more_pages(),
            total_count: engine.total_count(),
            is_loading: engine.is_loading_page(),
            is_backfilling: engine.is_backfilling(),
            last_error: engine.last_error(),
            outcome,
        }
    }
}

#[derive(Serialize)]
struct DetailView {
    #[serde(flatten)]
    detail: DetailRecord,
    threads: Vec<CommentThread>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(FeedError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            FeedError::NoMorePages | FeedError::PageInFlight { .. } => StatusCode::CONFLICT,
            FeedError::PageFetch { .. } => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        Self(e)
    }
}

async fn feed_view(State(state): State<AppState>) -> Json<FeedView> {
    Json(FeedView::of(&state.engine, None))
}

async fn set_filter(
    State(state): State<AppState>,
    Json(body): Json<FilterReq>,
) -> Result<Json<FeedView>, ApiError> {
    let outcome = state
        .engine
        .set_filter(FeedFilter::new(&body.query, &body.topics))
        .await?;
    spawn_backfill(&state, outcome);
    Ok(Json(FeedView::of(&state.engine, Some(outcome))))
}

async fn next_page(State(state): State<AppState>) -> Result<Json<FeedView>, ApiError> {
    let outcome = state.engine.load_next_page().await?;
    spawn_backfill(&state, outcome);
    Ok(Json(FeedView::of(&state.engine, Some(outcome))))
}

/// Hydrate the visible list in the background; the UI polls `/feed/details/{id}`.
fn spawn_backfill(state: &AppState, outcome: PageOutcome) {
    if !matches!(outcome, PageOutcome::Applied { added, .. } if added > 0) {
        return;
    }
    let engine = state.engine.clone();
    tokio::spawn(async move {
        let report = engine.backfill_current().await;
        info!(
            target: "feed::detail",
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed,
            "background backfill finished"
        );
    });
}

async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.engine.detail_for(&id) {
        Some(detail) => {
            let threads = comments::thread(&detail.comments);
            Json(DetailView { detail, threads }).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no detail loaded for '{id}'"),
            }),
        )
            .into_response(),
    }
}

async fn featured(State(state): State<AppState>) -> Json<Vec<DetailRecord>> {
    Json(state.engine.featured().await)
}
