use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let report = state.store.health().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "backend": report.backend,
            "objectStoreReachable": report.object_store_reachable,
            "localReachable": report.local_reachable,
        })),
    )
}
