// Print handler - runs the export workflow for one letter

use crate::error::ServiceError;
use crate::export::{ExportError, ExportJob};
use crate::server::ServerState;
use crate::server::error::{EXPORT_FAILED_MESSAGE, bad_request, internal_error};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde_json::json;

pub async fn handle_save_and_print(
    State(state): State<ServerState>,
    payload: Result<Json<ExportJob>, JsonRejection>,
) -> Response {
    let Json(job) = match payload {
        Ok(job) => job,
        Err(rejection) => {
            log::warn!("[Server] Rejected print request body: {}", rejection.body_text());
            return bad_request(&rejection.body_text());
        }
    };

    match state.workflow.run(&job).await {
        Ok((receipt, guard)) => {
            let response = Json(json!({
                "success": true,
                "pdfUrl": receipt.file.view_url,
            }))
            .into_response();
            guard.release_in_background();
            response
        }
        Err(e @ ExportError::Upstream { .. }) => {
            log::error!(
                "[Export] Print for '{}' failed: {}",
                job.borrower.as_deref().unwrap_or_default(),
                e
            );
            internal_error(EXPORT_FAILED_MESSAGE)
        }
        Err(e) => ServiceError::from(e).into_response(),
    }
}
