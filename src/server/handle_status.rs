// Status handler

use crate::server::ServerState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub async fn handle_status(State(state): State<ServerState>) -> Response {
    let cache = state.loader.cache();
    let snapshot = cache.current();

    let mut response = json!({
        "server": {
            "version": state.config.version,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "refresh_interval_seconds": state.config.refresh_interval_seconds,
        },
        "dataset": {
            "spreadsheet_id": state.config.spreadsheet_id,
            "range": state.loader.range(),
            "ready": snapshot.is_some(),
        }
    });

    if let Some(snapshot) = snapshot {
        response["dataset"]["generation"] = json!(snapshot.generation());
        response["dataset"]["rows"] = json!(snapshot.rows().len());
        response["dataset"]["borrowers"] = json!(snapshot.borrower_count());
        response["dataset"]["loaded_at"] = json!(snapshot.loaded_at().to_rfc3339());
    }

    if let Some(failure) = cache.last_failure() {
        response["dataset"]["last_failure"] = json!({
            "error": failure.error,
            "at": failure.at.to_rfc3339(),
        });
    }

    (StatusCode::OK, axum::Json(response)).into_response()
}
