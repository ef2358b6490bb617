// Service configuration - spreadsheet layout, refresh cadence and credentials
use crate::constants;
use crate::export::ExportSettings;
use crate::google::{Credentials, GoogleEndpoints, MetadataServerToken, StaticToken, TokenSource};
use anyhow::{Context, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static CELL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,3}[1-9][0-9]*$").expect("valid regex"));

/// A1 range on a named sheet; names with anything beyond `[A-Za-z0-9_]` are quoted
pub fn sheet_range(sheet: &str, cells: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{}!{}", sheet, cells)
    } else {
        format!("'{}'!{}", sheet.replace('\'', "''"), cells)
    }
}

/// Where Google access tokens come from, in order of precedence
#[derive(Clone)]
pub enum CredentialSource {
    /// Pre-issued bearer token, used as is
    AccessToken(String),
    /// Credential JSON passed inline
    Inline(String),
    /// Credential JSON file
    File(PathBuf),
    /// GCE / Cloud Run metadata server
    MetadataServer,
}

impl CredentialSource {
    /// Pick the first non-empty source
    pub fn resolve(
        access_token: Option<String>,
        inline: Option<String>,
        file: Option<PathBuf>,
    ) -> Self {
        let given = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        if let Some(token) = given(access_token) {
            Self::AccessToken(token)
        } else if let Some(blob) = given(inline) {
            Self::Inline(blob)
        } else if let Some(path) = file {
            Self::File(path)
        } else {
            Self::MetadataServer
        }
    }

    /// Human readable description without secrets
    pub fn describe(&self) -> String {
        match self {
            Self::AccessToken(_) => "static access token".to_string(),
            Self::Inline(_) => "inline credentials".to_string(),
            Self::File(path) => format!("credentials file {}", path.display()),
            Self::MetadataServer => "metadata server".to_string(),
        }
    }

    pub fn token_source(
        &self,
        http: reqwest::Client,
        endpoints: &GoogleEndpoints,
    ) -> Result<Arc<dyn TokenSource>> {
        match self {
            Self::AccessToken(token) => Ok(Arc::new(StaticToken::new(token.clone()))),
            Self::Inline(blob) => {
                let credentials =
                    Credentials::from_json(blob).context("Invalid inline Google credentials")?;
                log::debug!("[Auth] Using inline credentials for {}", credentials.principal());
                credentials.into_token_source(http)
            }
            Self::File(path) => {
                let credentials = Credentials::from_file(path)?;
                log::debug!(
                    "[Auth] Using {} for {}",
                    path.display(),
                    credentials.principal()
                );
                credentials.into_token_source(http)
            }
            Self::MetadataServer => Ok(Arc::new(MetadataServerToken::new(
                endpoints.metadata.clone(),
                http,
            ))),
        }
    }
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Everything read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spreadsheet_id: String,
    pub drive_folder_id: String,
    pub form_sheet: String,
    pub dataset_sheet: String,
    pub log_sheet: String,
    pub suffix_cell: String,
    pub refresh_interval: Duration,
    pub credentials: CredentialSource,
    pub endpoints: GoogleEndpoints,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: constants::DEFAULT_SPREADSHEET_ID.to_string(),
            drive_folder_id: constants::DEFAULT_DRIVE_FOLDER_ID.to_string(),
            form_sheet: constants::DEFAULT_FORM_SHEET.to_string(),
            dataset_sheet: constants::DEFAULT_DATASET_SHEET.to_string(),
            log_sheet: constants::DEFAULT_LOG_SHEET.to_string(),
            suffix_cell: constants::DEFAULT_SUFFIX_CELL.to_string(),
            refresh_interval: constants::DEFAULT_REFRESH_INTERVAL,
            credentials: CredentialSource::MetadataServer,
            endpoints: GoogleEndpoints::default(),
        }
    }
}

impl AppConfig {
    /// Range read on every dataset refresh
    pub fn dataset_range(&self) -> String {
        sheet_range(&self.dataset_sheet, constants::DATASET_COLUMNS)
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            form_sheet: self.form_sheet.clone(),
            log_sheet: self.log_sheet.clone(),
            suffix_cell: self.suffix_cell.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("spreadsheet id", &self.spreadsheet_id),
            ("drive folder id", &self.drive_folder_id),
            ("form sheet", &self.form_sheet),
            ("dataset sheet", &self.dataset_sheet),
            ("log sheet", &self.log_sheet),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must not be empty", what);
            }
        }
        if !CELL_REF.is_match(&self.suffix_cell) {
            anyhow::bail!(
                "Invalid suffix cell '{}': expected a single A1 cell such as J66",
                self.suffix_cell
            );
        }
        if self.refresh_interval.is_zero() {
            anyhow::bail!("Refresh interval must be greater than zero");
        }
        Ok(())
    }
}
