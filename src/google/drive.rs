// Drive v3 client - multipart upload of generated PDFs into one folder
use super::{FileStorage, StoredFile, TokenSource, ensure_success};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const BOUNDARY_BASE: &str = "debitur-print-upload-boundary";

pub struct DriveClient {
    http: reqwest::Client,
    upload_base: String,
    view_base: String,
    folder_id: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

impl DriveClient {
    pub fn new(
        http: reqwest::Client,
        endpoints: &super::GoogleEndpoints,
        folder_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            upload_base: endpoints.drive_upload.trim_end_matches('/').to_string(),
            view_base: endpoints.drive_view.trim_end_matches('/').to_string(),
            folder_id: folder_id.into(),
            tokens,
        }
    }

    /// Shareable link for a stored file
    pub fn view_url(&self, file_id: &str) -> String {
        format!("{}/file/d/{}/view", self.view_base, file_id)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// First boundary that occurs in none of the parts
fn pick_boundary(parts: &[&[u8]]) -> String {
    let mut boundary = BOUNDARY_BASE.to_string();
    let mut attempt = 0u32;
    while parts.iter().any(|part| contains(part, boundary.as_bytes())) {
        attempt += 1;
        boundary = format!("{}-{}", BOUNDARY_BASE, attempt);
    }
    boundary
}

/// `multipart/related` body (JSON metadata part, then the PDF part) and its boundary
fn multipart_body(metadata: &serde_json::Value, pdf: &[u8]) -> (String, Vec<u8>) {
    let metadata = metadata.to_string();
    let boundary = pick_boundary(&[metadata.as_bytes(), pdf]);

    let mut body = Vec::with_capacity(pdf.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(pdf);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (boundary, body)
}

#[async_trait]
impl FileStorage for DriveClient {
    async fn upload_pdf(&self, name: &str, bytes: Vec<u8>) -> Result<StoredFile> {
        let metadata = json!({
            "name": name,
            "parents": [self.folder_id],
            "mimeType": "application/pdf",
        });
        let token = self
            .tokens
            .access_token()
            .await
            .context("Failed to obtain Google access token")?;
        let (boundary, body) = multipart_body(&metadata, &bytes);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", "id,webViewLink")])
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload {}", name))?;
        let response = ensure_success(response, "files.create").await?;
        let created: CreatedFile = response
            .json()
            .await
            .context("Malformed files.create response")?;

        log::debug!("[Drive] Uploaded {} as {}", name, created.id);
        Ok(StoredFile {
            view_url: self.view_url(&created.id),
            id: created.id,
        })
    }
}
