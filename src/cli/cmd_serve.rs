// Serve command - start HTTP server
use super::utils::{SpreadsheetArgs, parse_duration_for_clap};
use anyhow::{Context, Result};
use clap::Args;
use debitur_print::server::{StartupConfig, start_server};
use tokio::time::Duration;

#[derive(Args)]
#[command(
    about = "Start HTTP server",
    long_about = "Start the HTTP server with the borrower form, the lookup endpoints and the
print endpoint. The dataset sheet is loaded in the background right after
startup and reloaded on every refresh interval; a failed reload keeps serving
the previous data.

Credentials are taken from --access-token, GOOGLE_CREDENTIALS,
--credentials-file (GOOGLE_APPLICATION_CREDENTIALS), in that order, and fall
back to the metadata server when running on Google Cloud.",
    help_template = crate::clap_help!(
        examples: "  # Start server on default port (8080)\n  \
                   {bin} serve\n\n  \
                   # Custom host and port\n  \
                   {bin} serve --host 0.0.0.0 --port 3000\n\n  \
                   # Service account key and a faster refresh\n  \
                   {bin} serve --credentials-file key.json --refresh-interval 15m"
    )
)]
pub struct ServeCommand {
    /// HTTP server port
    #[arg(long, env = "PORT", default_value = "8080", help_heading = "Server Options")]
    pub port: u16,

    /// HTTP server host
    #[arg(long, default_value = "127.0.0.1", help_heading = "Server Options")]
    pub host: String,

    /// How often the dataset sheet is reloaded
    #[arg(long, default_value = "1h", value_parser = parse_duration_for_clap, help_heading = "Server Options")]
    pub refresh_interval: Duration,

    #[command(flatten)]
    pub sheets: SpreadsheetArgs,
}

pub fn run(cmd: ServeCommand) -> Result<()> {
    use tokio::runtime::Runtime;

    let rt = Runtime::new().context("Failed to create tokio runtime")?;

    let startup_config = StartupConfig {
        app: cmd.sheets.into_app_config(cmd.refresh_interval),
        host: cmd.host,
        port: cmd.port,
    };

    rt.block_on(start_server(startup_config))
}
