// Google adapters - Sheets, PDF export and Drive upload over REST
//
// The traits below are the seams the cache loader and the export workflow
// depend on; `SheetsClient` and `DriveClient` are the production
// implementations, tests substitute in-memory fakes.

pub mod auth;
mod drive;
mod sheets;

use crate::constants;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use auth::{Credentials, MetadataServerToken, StaticToken, TokenSource};
pub use drive::DriveClient;
pub use sheets::SheetsClient;

/// Spreadsheet operations used by the loader and the export workflow
#[async_trait]
pub trait SpreadsheetService: Send + Sync {
    /// Read a range in A1 notation; rows come back with trailing empties trimmed
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<Value>>>;

    /// Append one row after the table found at `range`
    async fn append_row(&self, range: &str, row: Vec<Value>) -> Result<()>;

    /// Numeric sheet id (`gid`) for a sheet title
    async fn sheet_id(&self, title: &str) -> Result<i64>;

    /// Show or hide a sheet
    async fn set_sheet_hidden(&self, sheet_id: i64, hidden: bool) -> Result<()>;

    /// Export a cell range of one sheet as PDF bytes
    async fn export_pdf(&self, sheet_id: i64, range: &str) -> Result<Vec<u8>>;
}

/// Archive storage for generated documents
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn upload_pdf(&self, name: &str, bytes: Vec<u8>) -> Result<StoredFile>;
}

/// A file created in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    /// Shareable view link
    pub view_url: String,
}

/// Base URLs of every Google endpoint the service talks to
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub sheets_api: String,
    pub docs: String,
    pub drive_upload: String,
    pub drive_view: String,
    pub metadata: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            sheets_api: constants::GOOGLE_SHEETS_API_URL.to_string(),
            docs: constants::GOOGLE_DOCS_URL.to_string(),
            drive_upload: constants::GOOGLE_DRIVE_UPLOAD_URL.to_string(),
            drive_view: constants::GOOGLE_DRIVE_VIEW_URL.to_string(),
            metadata: constants::GOOGLE_METADATA_URL.to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Point every endpoint at one base URL (local fakes)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            sheets_api: format!("{}/v4", base),
            docs: base.to_string(),
            drive_upload: format!("{}/upload/drive/v3", base),
            drive_view: base.to_string(),
            metadata: format!("{}/computeMetadata/v1", base),
        }
    }
}

/// Shared reqwest client with the service user agent and timeout
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(constants::HTTP_TIMEOUT_SECS))
        .user_agent(constants::user_agent())
        .build()?)
}

/// Fail with the response body when Google answers with a non-2xx status
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{} failed with status {}: {}", what, status, body.trim())
}
