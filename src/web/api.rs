use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::models::AvatarPosition;

/// Ingestion endpoint: accepts a JSON array of raw avatar positions, runs the
/// enrichment pipeline, and responds with an empty body. Failures inside the
/// pipeline degrade individual avatars instead of failing the request.
pub async fn ingest_avatar_positions(
    State(state): State<AppState>,
    Json(positions): Json<Vec<AvatarPosition>>,
) -> StatusCode {
    let count = positions.len();
    state.pipeline.ingest(positions).await;
    info!("Ingested batch of {} avatar positions", count);

    StatusCode::OK
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
