// Error handling utilities and response helpers

use crate::error::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::any::Any;

/// Body of every unexpected 500
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Body of a failed print request
pub const EXPORT_FAILED_MESSAGE: &str = "Error saving or printing SP";

/// Helper to create a JSON error response
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(json!({"error": message}))).into_response()
}

/// Helper for "not found" errors
pub fn not_found(message: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, message)
}

/// Helper for internal server errors
pub fn internal_error(message: &str) -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// Helper for bad request errors
pub fn bad_request(message: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, message)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::BadRequest(message) => bad_request(&message),
            ServiceError::NotFound(message) => not_found(&message),
            ServiceError::NotReady => {
                json_error(StatusCode::SERVICE_UNAVAILABLE, &ServiceError::NotReady.to_string())
            }
            ServiceError::Upstream(e) => {
                log::error!("[Server] Request failed: {:#}", e);
                internal_error(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

/// Response for a panicking handler (`CatchPanicLayer`)
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    log::error!("[Server] Handler panicked: {}", detail);
    internal_error(INTERNAL_ERROR_MESSAGE)
}
