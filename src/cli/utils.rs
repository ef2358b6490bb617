// Shared CLI arguments: spreadsheet layout and Google credentials

use clap::{Args, ValueHint};
use debitur_print::config::{AppConfig, CredentialSource};
use debitur_print::constants;
use debitur_print::google::GoogleEndpoints;
use std::path::PathBuf;
use tokio::time::Duration;

/// Clap value parser for "60s" / "5m" / "1h"
pub fn parse_duration_for_clap(s: &str) -> Result<Duration, String> {
    debitur_print::server::parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Args, Clone)]
pub struct SpreadsheetArgs {
    /// Spreadsheet holding the dataset, form and log sheets
    #[arg(long, env = "DEBITUR_SPREADSHEET_ID", default_value = constants::DEFAULT_SPREADSHEET_ID, help_heading = "Spreadsheet")]
    pub spreadsheet_id: String,

    /// Drive folder receiving generated PDFs
    #[arg(long, env = "DEBITUR_DRIVE_FOLDER_ID", default_value = constants::DEFAULT_DRIVE_FOLDER_ID, help_heading = "Spreadsheet")]
    pub drive_folder_id: String,

    /// Printable form sheet
    #[arg(long, default_value = constants::DEFAULT_FORM_SHEET, help_heading = "Spreadsheet")]
    pub form_sheet: String,

    /// Dataset sheet
    #[arg(long, default_value = constants::DEFAULT_DATASET_SHEET, help_heading = "Spreadsheet")]
    pub dataset_sheet: String,

    /// Print log sheet
    #[arg(long, default_value = constants::DEFAULT_LOG_SHEET, help_heading = "Spreadsheet")]
    pub log_sheet: String,

    /// Form cell appended to PDF filenames
    #[arg(long, default_value = constants::DEFAULT_SUFFIX_CELL, help_heading = "Spreadsheet")]
    pub suffix_cell: String,

    /// Pre-issued OAuth access token
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true, help_heading = "Credentials")]
    pub access_token: Option<String>,

    /// Service account or authorized user JSON file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", value_hint = ValueHint::FilePath, help_heading = "Credentials")]
    pub credentials_file: Option<PathBuf>,

    /// Service account or authorized user JSON, inline
    #[arg(long, env = "GOOGLE_CREDENTIALS", hide = true, hide_env_values = true)]
    pub credentials_json: Option<String>,
}

impl SpreadsheetArgs {
    pub fn into_app_config(self, refresh_interval: Duration) -> AppConfig {
        AppConfig {
            spreadsheet_id: self.spreadsheet_id,
            drive_folder_id: self.drive_folder_id,
            form_sheet: self.form_sheet,
            dataset_sheet: self.dataset_sheet,
            log_sheet: self.log_sheet,
            suffix_cell: self.suffix_cell,
            refresh_interval,
            credentials: CredentialSource::resolve(
                self.access_token,
                self.credentials_json,
                self.credentials_file,
            ),
            endpoints: GoogleEndpoints::default(),
        }
    }
}
