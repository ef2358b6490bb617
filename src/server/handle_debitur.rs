// Borrower lookup handlers

use crate::server::ServerState;
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct NameParams {
    name: Option<String>,
}

pub async fn handle_debitur_data(
    State(state): State<ServerState>,
    Query(params): Query<NameParams>,
) -> Response {
    match state.queries.borrower_detail(params.name.as_deref()) {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn handle_debitur_table(
    State(state): State<ServerState>,
    Query(params): Query<NameParams>,
) -> Response {
    match state.queries.borrower_history(params.name.as_deref()) {
        Ok(rows) => Json(json!({"success": true, "data": rows})).into_response(),
        Err(e) => e.into_response(),
    }
}
