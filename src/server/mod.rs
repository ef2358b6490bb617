// HTTP server for borrower lookup and letter printing

mod config;
mod error;
mod handle_debitur;
mod handle_print;
mod handle_root;
mod handle_status;
mod routes;
mod startup;
mod utils;

use crate::cache::DatasetLoader;
use crate::export::ExportWorkflow;
use crate::query::QueryService;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;

pub use config::ServerConfig;
pub use handle_debitur::*;
pub use handle_print::*;
pub use handle_root::*;
pub use handle_status::*;
pub use startup::{Services, StartupConfig, initialize_services, run_refresh_loop, start_server};
pub use utils::parse_duration;

#[derive(Clone)]
pub struct ServerState {
    pub queries: QueryService,
    pub loader: Arc<DatasetLoader>,
    pub workflow: Arc<ExportWorkflow>,
    pub config: ServerConfig,
    pub start_time: Instant,
}

pub struct Server {
    state: ServerState,
}

impl Server {
    pub fn new(services: &Services, config: ServerConfig) -> Self {
        Self {
            state: ServerState {
                queries: services.queries.clone(),
                loader: Arc::clone(&services.loader),
                workflow: Arc::clone(&services.workflow),
                config,
                start_time: Instant::now(),
            },
        }
    }

    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }
}
