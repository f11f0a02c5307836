//! HTTP routes of the tracker service

use crate::{
    model::{DownloadSource, DownloadStats, StatsTable, MAX_ITEM_NAME_LEN},
    store::DownloadStore,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

type AppState = Arc<DownloadStore>;

/// Build the API router.
pub fn build_router(store: AppState) -> Router {
    // browsers post the download form from the web UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/track/download", post(track_download))
        .route("/track/stats", get(download_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn health() -> &'static str {
    "OK"
}

// source stays a string so an unknown value is a 400, not a form rejection
#[derive(Debug, Deserialize)]
struct TrackForm {
    item_name: String,
    source: String,
}

/// Response of `POST /track/download`
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackResponse {
    /// Tracked item
    pub item_name: String,
    /// Counters after this download
    pub stats: DownloadStats,
}

async fn track_download(
    State(store): State<AppState>,
    Form(form): Form<TrackForm>,
) -> Result<Json<TrackResponse>, (StatusCode, String)> {
    let item_name = form.item_name.trim();
    if item_name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "item_name is required".into()));
    }
    if item_name.len() > MAX_ITEM_NAME_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("item_name longer than {MAX_ITEM_NAME_LEN} bytes"),
        ));
    }
    let source: DownloadSource = form
        .source
        .parse()
        .map_err(|e: crate::model::ParseSourceError| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let stats = store.record(item_name, source).await.map_err(|e| {
        error!("Failed to record download: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "failed to record download".into())
    })?;

    Ok(Json(TrackResponse {
        item_name: item_name.to_string(),
        stats,
    }))
}

async fn download_stats(State(store): State<AppState>) -> Json<StatsTable> {
    Json(store.stats().await)
}
