use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use dehug_tracker::{build_router, DownloadStats, DownloadStore, StatsTable, MAX_ITEM_NAME_LEN};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

fn track_request(form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/track/download")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(app: &Router, request: Request<Body>) -> (StatusCode, Option<T>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).ok())
}

async fn stats(app: &Router) -> StatsTable {
    let request = Request::get("/track/stats").body(Body::empty()).unwrap();
    let (status, table) = body_json(app, request).await;
    assert_eq!(status, StatusCode::OK);
    table.unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_router(Arc::new(DownloadStore::in_memory()));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn downloads_are_counted_per_source() {
    let app = build_router(Arc::new(DownloadStore::in_memory()));

    for form in [
        "item_name=census-data&source=sdk",
        "item_name=census-data&source=ui",
        "item_name=census-data&source=sdk",
        "item_name=swahili-bert&source=ui",
    ] {
        let response = app.clone().oneshot(track_request(form)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let table = stats(&app).await;
    assert_eq!(table["census-data"], DownloadStats { sdk: 2, ui: 1, total: 3 });
    assert_eq!(table["swahili-bert"], DownloadStats { sdk: 0, ui: 1, total: 1 });
}

#[tokio::test]
async fn track_response_carries_updated_stats() {
    let app = build_router(Arc::new(DownloadStore::in_memory()));
    let (status, body) =
        body_json::<serde_json::Value>(&app, track_request("item_name=census-data&source=sdk")).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["item_name"], "census-data");
    assert_eq!(body["stats"]["total"], 1);
}

#[tokio::test]
async fn unknown_source_is_rejected() {
    let app = build_router(Arc::new(DownloadStore::in_memory()));
    let response = app
        .clone()
        .oneshot(track_request("item_name=census-data&source=cli"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(stats(&app).await.is_empty());
}

#[tokio::test]
async fn blank_item_is_rejected() {
    let app = build_router(Arc::new(DownloadStore::in_memory()));
    let response = app
        .oneshot(track_request("item_name=+&source=sdk"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_item_name_is_rejected() {
    let app = build_router(Arc::new(DownloadStore::in_memory()));
    let at_limit = "a".repeat(MAX_ITEM_NAME_LEN);
    let over_limit = "a".repeat(MAX_ITEM_NAME_LEN + 1);

    let response = app
        .clone()
        .oneshot(track_request(&format!("item_name={over_limit}&source=sdk")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(track_request(&format!("item_name={at_limit}&source=sdk")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stats(&app).await.len(), 1);
}

#[tokio::test]
async fn failed_snapshot_is_server_error_and_not_counted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("downloads.json");
    let app = build_router(Arc::new(DownloadStore::open(&path).await.unwrap()));

    let response = app
        .clone()
        .oneshot(track_request("item_name=census-data&source=sdk"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(stats(&app).await.is_empty());
}

#[tokio::test]
async fn persisted_counts_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("downloads.json");

    let app = build_router(Arc::new(DownloadStore::open(&path).await.unwrap()));
    app.clone()
        .oneshot(track_request("item_name=census-data&source=ui"))
        .await
        .unwrap();
    drop(app);

    let restarted = build_router(Arc::new(DownloadStore::open(&path).await.unwrap()));
    assert_eq!(stats(&restarted).await["census-data"].ui, 1);
}
