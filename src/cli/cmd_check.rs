// Check command - load the dataset once and report on it
use super::utils::SpreadsheetArgs;
use anyhow::{Context, Result};
use clap::Args;
use debitur_print::RefreshOutcome;
use debitur_print::constants;
use debitur_print::server::initialize_services;
use serde_json::json;

#[derive(Args)]
#[command(
    about = "Load the dataset once and report",
    long_about = "Fetch the dataset sheet with the configured credentials and print row and
borrower counts. With --borrower, also print the detail and history that the
server would return for that borrower. Useful to verify credentials and sheet
layout before starting the server.",
    help_template = crate::clap_help!(
        examples: "  # Verify access and count rows\n  \
                   {bin} check\n\n  \
                   # Show one borrower\n  \
                   {bin} check --borrower \"Budi Santoso\"\n\n  \
                   # List every borrower in the picker\n  \
                   {bin} check --list"
    )
)]
pub struct CheckCommand {
    /// Print the detail and history for this borrower
    #[arg(long)]
    pub borrower: Option<String>,

    /// Print every borrower name offered by the form
    #[arg(long)]
    pub list: bool,

    #[command(flatten)]
    pub sheets: SpreadsheetArgs,
}

pub fn run(cmd: CheckCommand, quiet: bool) -> Result<()> {
    use tokio::runtime::Runtime;

    let rt = Runtime::new().context("Failed to create tokio runtime")?;
    let config = cmd.sheets.into_app_config(constants::DEFAULT_REFRESH_INTERVAL);
    let services = initialize_services(&config)?;

    let outcome = rt.block_on(services.loader.refresh());
    let (generation, rows, borrowers) = match outcome {
        RefreshOutcome::Loaded {
            generation,
            rows,
            borrowers,
        } => (generation, rows, borrowers),
        RefreshOutcome::KeptPrevious { error } => {
            anyhow::bail!("Failed to load {}: {}", config.dataset_range(), error)
        }
    };

    if !quiet {
        eprintln!("Loaded {} (generation {})", config.dataset_range(), generation);
        eprintln!("  Rows:      {}", rows);
        eprintln!("  Borrowers: {}", borrowers);
    }

    if cmd.list {
        for name in services.queries.list_borrowers()? {
            println!("{}", name);
        }
    }

    if let Some(name) = cmd.borrower.as_deref() {
        let detail = services.queries.borrower_detail(Some(name))?;
        let history = services.queries.borrower_history(Some(name))?;
        let report = json!({"detail": detail, "history": history});
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
