// Server startup and initialization logic
// Builds the Google clients from configuration, wires the cache, queries and
// export workflow together, and runs the HTTP server with the refresh loop.

use crate::cache::{DatasetCache, DatasetLoader};
use crate::config::AppConfig;
use crate::constants;
use crate::export::ExportWorkflow;
use crate::google::{self, DriveClient, FileStorage, SheetsClient, SpreadsheetService};
use crate::query::QueryService;
use crate::runtime::ServiceRuntime;
use crate::server::{Server, ServerConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Duration;

/// Configuration for server startup
pub struct StartupConfig {
    pub app: AppConfig,
    pub host: String,
    pub port: u16,
}

/// Shared services behind the HTTP handlers and the CLI
pub struct Services {
    pub cache: Arc<DatasetCache>,
    pub loader: Arc<DatasetLoader>,
    pub queries: QueryService,
    pub workflow: Arc<ExportWorkflow>,
}

impl Services {
    pub fn new(
        sheets: Arc<dyn SpreadsheetService>,
        storage: Arc<dyn FileStorage>,
        config: &AppConfig,
    ) -> Self {
        let cache = Arc::new(DatasetCache::new());
        let loader = Arc::new(DatasetLoader::new(
            Arc::clone(&sheets),
            config.dataset_range(),
            Arc::clone(&cache),
        ));
        Self {
            queries: QueryService::new(Arc::clone(&cache)),
            workflow: Arc::new(ExportWorkflow::new(sheets, storage, config.export_settings())),
            cache,
            loader,
        }
    }
}

/// Validate configuration and build the Google-backed services
pub fn initialize_services(config: &AppConfig) -> Result<Services> {
    config.validate().context("Invalid configuration")?;

    let http = google::http_client().context("Failed to build HTTP client")?;
    let tokens = config
        .credentials
        .token_source(http.clone(), &config.endpoints)
        .context("Failed to set up Google credentials")?;
    log::debug!("[Auth] Using {}", config.credentials.describe());

    let sheets = Arc::new(SheetsClient::new(
        http.clone(),
        &config.endpoints,
        &config.spreadsheet_id,
        Arc::clone(&tokens),
    ));
    let drive = Arc::new(DriveClient::new(
        http,
        &config.endpoints,
        &config.drive_folder_id,
        tokens,
    ));

    Ok(Services::new(sheets, drive, config))
}

/// Load the dataset now and then every `interval` until shutdown
pub async fn run_refresh_loop(loader: Arc<DatasetLoader>, interval: Duration, runtime: ServiceRuntime) {
    let mut shutdown_rx = runtime.shutdown_signal();
    log::debug!(
        "[Cache] Refresh loop started for {} (interval: {:?})",
        loader.range(),
        interval
    );

    loop {
        // An in-flight refresh is abandoned on shutdown; the served snapshot
        // is only replaced once a fetch completes.
        tokio::select! {
            _ = loader.refresh() => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }

        if !runtime.sleep_unless_shutdown(interval).await {
            break;
        }
    }

    log::debug!("[Cache] Refresh loop stopped");
}

fn setup_refresh_loop(
    services: &Services,
    config: &StartupConfig,
    runtime: &ServiceRuntime,
    background_tasks: &mut JoinSet<()>,
) {
    let loader = Arc::clone(&services.loader);
    let interval = config.app.refresh_interval;
    let runtime = runtime.clone();
    background_tasks.spawn(run_refresh_loop(loader, interval, runtime));
}

/// Main server startup function that orchestrates all initialization
pub async fn start_server(config: StartupConfig) -> Result<()> {
    use std::net::SocketAddr;

    let services = initialize_services(&config.app)?;

    let addr = format!("{}:{}", config.host, config.port);
    let socket_addr: SocketAddr = addr.parse().context("Invalid address format")?;

    let server_config = ServerConfig {
        version: constants::VERSION.to_string(),
        spreadsheet_id: config.app.spreadsheet_id.clone(),
        refresh_interval_seconds: config.app.refresh_interval.as_secs(),
    };
    let server = Server::new(&services, server_config);
    let app = server.router();

    let server_runtime = ServiceRuntime::new();
    let mut background_tasks = JoinSet::new();

    let listener = tokio::net::TcpListener::bind(socket_addr)
        .await
        .context("Failed to bind to address")?;

    // Dataset loading starts after a successful bind; until it completes the
    // form answers with the not-ready message.
    setup_refresh_loop(&services, &config, &server_runtime, &mut background_tasks);

    display_server_info(&addr, &config);
    eprintln!("\nPress Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(server_runtime.create_shutdown_future())
        .await
        .context("Server error")?;

    services.workflow.wait_for_rehides().await;

    server_runtime
        .wait_for_shutdown_cleanup("Server", &mut background_tasks)
        .await;

    Ok(())
}

/// Display server startup information
fn display_server_info(addr: &str, config: &StartupConfig) {
    let app = &config.app;
    eprintln!("{} v{} HTTP server started", constants::BINARY_NAME, constants::VERSION);
    eprintln!("  Listening: http://{}", addr);
    eprintln!("  Spreadsheet: {}", app.spreadsheet_id);
    eprintln!("    Dataset: {}", app.dataset_range());
    eprintln!("    Form sheet: {} (suffix cell {})", app.form_sheet, app.suffix_cell);
    eprintln!("    Log sheet: {}", app.log_sheet);
    eprintln!("  Drive folder: {}", app.drive_folder_id);
    eprintln!("  Refresh interval: {:?}", app.refresh_interval);
    eprintln!("  Credentials: {}", app.credentials.describe());
}
