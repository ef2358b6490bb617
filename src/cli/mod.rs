use anyhow::Result;
use clap::{Parser, Subcommand};

// CLI Commands (cmd_ prefix)
mod cmd_check;
mod cmd_serve;

// Helper modules (no cmd_ prefix)
mod logger;
mod utils;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(bin_name = "debitur-print")]
#[command(version = VERSION)]
#[command(about = concat!("debitur-print v", env!("CARGO_PKG_VERSION"), " - borrower lookup and letter printing"))]
#[command(long_about = concat!(
    "debitur-print v", env!("CARGO_PKG_VERSION"), " - borrower lookup and letter printing\n\n",
    "Serves a borrower selection form backed by a Google spreadsheet and\n",
    "prints warning letters, customer cards and repossession letters to PDF,\n",
    "archiving every print in Google Drive and in the spreadsheet's print log."
))]
#[command(propagate_version = true)]
pub struct Cli {
    /// Only print errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve(cmd_serve::ServeCommand),
    Check(cmd_check::CheckCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init_logger(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Serve(cmd) => cmd_serve::run(cmd)?,
        Commands::Check(cmd) => cmd_check::run(cmd, cli.quiet)?,
    }

    Ok(())
}

/// Macro to create clap help templates with examples
/// This works around the limitation that {bin} doesn't work in after_help
#[macro_export]
macro_rules! clap_help {
    (examples: $examples:literal) => {{
        const BIN: &str = env!("CARGO_PKG_NAME");
        concat!(
            "{about-with-newline}\n",
            "{usage-heading} {usage}\n\n",
            "{all-args}\n\n",
            "Examples:\n",
            $examples
        ).replace("{bin}", BIN)
    }};
}
