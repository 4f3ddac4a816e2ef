//! Router-level tests driven through `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use avatar_relay::broadcast::Broadcaster;
use avatar_relay::enrichment::EnrichmentPipeline;
use avatar_relay::models::LiveUpdate;
use avatar_relay::profile_images::ProfileImageResolver;
use avatar_relay::web::{AppState, WebServer};

use common::{profile_page, test_database, test_profiles_config, FakeProfileSource};

const AVATAR_ID: &str = "0f9be517-9b52-4b3b-8ee9-32a874f1a82e";

async fn test_state() -> AppState {
    let database = test_database().await;
    let fetcher = Arc::new(
        FakeProfileSource::new()
            .with_page(AVATAR_ID, profile_page("c63d556e-7b3c-4a85-accd-214c32663482")),
    );
    let resolver = ProfileImageResolver::new(database, fetcher, &test_profiles_config());
    let broadcaster = Arc::new(Broadcaster::new());
    let pipeline = EnrichmentPipeline::new(resolver, broadcaster.clone());

    AppState {
        pipeline,
        broadcaster,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = WebServer::router(test_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_ingestion_endpoint_returns_empty_success() {
    let state = test_state().await;
    let (_id, mut rx) = state.broadcaster.subscribe().await;
    let app = WebServer::router(state);

    let batch = json!([{
        "id": AVATAR_ID,
        "name": "resident",
        "displayName": "Resident",
        "x": 1.0,
        "y": 2.0,
        "z": 3.0
    }]);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/avatar-positions")
                .header("content-type", "application/json")
                .body(Body::from(batch.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.is_empty());

    // Ingestion completed before the response, so the broadcast is already
    // queued for the subscriber
    let update: LiveUpdate = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(update.data.len(), 1);
    assert_eq!(update.data[0].id, AVATAR_ID);
}

#[tokio::test]
async fn test_ingestion_endpoint_rejects_malformed_body() {
    let app = WebServer::router(test_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/avatar-positions")
                .header("content-type", "application/json")
                .body(Body::from("{\"not\": \"an array\"}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
