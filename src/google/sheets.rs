// Sheets v4 client - values, sheet properties and the PDF export endpoint
use super::{SpreadsheetService, TokenSource, ensure_success};
use crate::constants;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// REST client bound to one spreadsheet
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: String,
    docs_base: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        endpoints: &super::GoogleEndpoints,
        spreadsheet_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            api_base: endpoints.sheets_api.trim_end_matches('/').to_string(),
            docs_base: endpoints.docs.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }

    /// `<api>/spreadsheets/<id>` plus extra path segments, each percent-encoded
    fn spreadsheet_url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}/spreadsheets", self.api_base))
            .context("Invalid Sheets API base URL")?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Sheets API base URL cannot carry a path"))?;
            path.push(&self.spreadsheet_id);
            path.extend(segments);
        }
        Ok(url)
    }

    async fn bearer(&self) -> Result<String> {
        self.tokens
            .access_token()
            .await
            .context("Failed to obtain Google access token")
    }

    async fn batch_update(&self, requests: Value) -> Result<()> {
        let url = self.spreadsheet_url(&[])?;
        // `<id>:batchUpdate` is a single path segment
        let url = reqwest::Url::parse(&format!("{}:batchUpdate", url))?;
        let response = self
            .http
            .post(url)
            .bearer_auth(self.bearer().await?)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .context("Failed to send batchUpdate")?;
        ensure_success(response, "spreadsheets.batchUpdate").await?;
        Ok(())
    }
}

#[async_trait]
impl SpreadsheetService for SheetsClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<Value>>> {
        let url = self.spreadsheet_url(&["values", range])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .with_context(|| format!("Failed to read range {}", range))?;
        let response = ensure_success(response, "values.get").await?;
        let body: ValueRange = response
            .json()
            .await
            .with_context(|| format!("Malformed values response for {}", range))?;
        Ok(body.values)
    }

    async fn append_row(&self, range: &str, row: Vec<Value>) -> Result<()> {
        let segment = format!("{}:append", range);
        let url = self.spreadsheet_url(&["values", &segment])?;
        let response = self
            .http
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .bearer_auth(self.bearer().await?)
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .with_context(|| format!("Failed to append to {}", range))?;
        ensure_success(response, "values.append").await?;
        Ok(())
    }

    async fn sheet_id(&self, title: &str) -> Result<i64> {
        let url = self.spreadsheet_url(&[])?;
        let response = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .context("Failed to fetch spreadsheet metadata")?;
        let response = ensure_success(response, "spreadsheets.get").await?;
        let meta: SpreadsheetMeta = response
            .json()
            .await
            .context("Malformed spreadsheet metadata")?;
        meta.sheets
            .into_iter()
            .find(|s| s.properties.title == title)
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| anyhow::anyhow!("Sheet '{}' not found in spreadsheet", title))
    }

    async fn set_sheet_hidden(&self, sheet_id: i64, hidden: bool) -> Result<()> {
        self.batch_update(json!([{
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "hidden": hidden },
                "fields": "hidden",
            }
        }]))
        .await
    }

    async fn export_pdf(&self, sheet_id: i64, range: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/spreadsheets/d/{}/export",
            self.docs_base, self.spreadsheet_id
        );
        let gid = sheet_id.to_string();
        let mut params: Vec<(&str, &str)> = constants::PDF_EXPORT_OPTIONS.to_vec();
        params.push(("gid", &gid));
        params.push(("range", range));

        let response = self
            .http
            .get(&url)
            .query(&params)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .context("Failed to request PDF export")?;
        let response = ensure_success(response, "PDF export").await?;
        let bytes = response.bytes().await.context("Failed to read PDF body")?;
        Ok(bytes.to_vec())
    }
}
