// Route setup and configuration

use crate::server::ServerState;
use crate::server::error::panic_response;
use crate::server::{
    handle_debitur_data, handle_debitur_table, handle_root, handle_save_and_print, handle_status,
};
use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/getDebiturData", get(handle_debitur_data))
        .route("/getDebiturTableData", get(handle_debitur_table))
        .route("/saveAndPrint", post(handle_save_and_print))
        .route("/status", get(handle_status))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
