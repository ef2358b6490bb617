#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use debitur_print::config::{AppConfig, CredentialSource};
use debitur_print::google::GoogleEndpoints;
use debitur_print::server::{Server, ServerConfig, Services, initialize_services};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SPREADSHEET_ID: &str = "sheet-123";
pub const FOLDER_ID: &str = "folder-9";
pub const ACCESS_TOKEN: &str = "test-token";
pub const FORM_GID: i64 = 7;

/// One file received by the fake Drive upload endpoint
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: String,
    pub name: String,
    pub parents: Vec<String>,
    pub mime_type: String,
    pub pdf_bytes: usize,
}

/// In-memory spreadsheet, Drive folder and token endpoints
#[derive(Default)]
pub struct FakeGoogleState {
    pub dataset: Mutex<Vec<Vec<Value>>>,
    pub log_rows: Mutex<Vec<Vec<Value>>>,
    pub suffix: Mutex<Option<String>>,
    pub form_hidden: Mutex<bool>,
    pub visibility_changes: Mutex<Vec<bool>>,
    pub exports: Mutex<Vec<HashMap<String, String>>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub requests: Mutex<Vec<String>>,
    pub token_grants: Mutex<Vec<HashMap<String, String>>>,
    pub fail_dataset: AtomicBool,
    pub fail_export: AtomicBool,
}

impl FakeGoogleState {
    pub fn set_dataset(&self, rows: Vec<Vec<Value>>) {
        *self.dataset.lock().unwrap() = rows;
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn is_form_hidden(&self) -> bool {
        *self.form_hidden.lock().unwrap()
    }

    fn record(&self, entry: String) {
        self.requests.lock().unwrap().push(entry);
    }
}

pub struct FakeGoogle {
    pub base_url: String,
    pub state: Arc<FakeGoogleState>,
    handle: JoinHandle<()>,
}

impl Drop for FakeGoogle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl FakeGoogle {
    pub fn endpoints(&self) -> GoogleEndpoints {
        GoogleEndpoints::with_base(&self.base_url)
    }

    /// Service configuration pointing every Google call at this fake
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            spreadsheet_id: SPREADSHEET_ID.to_string(),
            drive_folder_id: FOLDER_ID.to_string(),
            credentials: CredentialSource::AccessToken(ACCESS_TOKEN.to_string()),
            endpoints: self.endpoints(),
            ..Default::default()
        }
    }
}

/// A 16-column dataset row; columns not listed stay empty
pub fn dataset_row(
    category: &str,
    app_id: &str,
    name: &str,
    label: &str,
    installment: &str,
    overdue_now: &str,
    status: &str,
) -> Vec<Value> {
    let mut row = vec![json!(""); 16];
    row[0] = json!(category);
    row[1] = json!(app_id);
    row[2] = json!(name);
    row[8] = json!(label);
    row[9] = json!(installment);
    row[10] = json!(format!("UID-{}", app_id));
    row[12] = json!(overdue_now);
    row[13] = json!("750000");
    row[14] = json!("12000000");
    row[15] = json!(status);
    row
}

pub fn sample_dataset() -> Vec<Vec<Value>> {
    vec![
        dataset_row("Car", "APP-1", "Acme", "10", "500000", "250000", "Current"),
        dataset_row("Car", "APP-2", " Budi ", "3", "300000", "abc", "Overdue"),
        dataset_row("Heavy Equipment", "APP-3", "Excavator Co", "1", "900000", "0", "Current"),
        dataset_row("Car", "APP-4", "Acme", "11", "500000", "", "Overdue"),
    ]
}

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let expected = format!("Bearer {}", ACCESS_TOKEN);
    let given = headers.get("authorization").and_then(|v| v.to_str().ok());
    if given == Some(expected.as_str()) {
        None
    } else {
        Some((StatusCode::UNAUTHORIZED, Json(json!({"error": {"code": 401}}))).into_response())
    }
}

async fn values_get(
    State(state): State<Arc<FakeGoogleState>>,
    Path((_id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("GET values {}", range));
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    let values: Vec<Vec<Value>> = if range.starts_with("Dataset!") {
        if state.fail_dataset.load(Ordering::SeqCst) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response();
        }
        state.dataset.lock().unwrap().clone()
    } else if range == "Page!A2:A" {
        state
            .log_rows
            .lock()
            .unwrap()
            .iter()
            .map(|row| row.iter().take(1).cloned().collect())
            .collect()
    } else if range == "Lembar!J66" {
        state
            .suffix
            .lock()
            .unwrap()
            .clone()
            .map(|s| vec![vec![json!(s)]])
            .unwrap_or_default()
    } else {
        return (StatusCode::BAD_REQUEST, format!("unexpected range {}", range)).into_response();
    };

    if values.is_empty() {
        Json(json!({"range": range, "majorDimension": "ROWS"})).into_response()
    } else {
        Json(json!({"range": range, "majorDimension": "ROWS", "values": values})).into_response()
    }
}

async fn values_append(
    State(state): State<Arc<FakeGoogleState>>,
    Path((_id, range)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(format!("POST values {}", range));
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    if range != "Page!A2:append"
        || params.get("valueInputOption").map(String::as_str) != Some("RAW")
        || params.get("insertDataOption").map(String::as_str) != Some("INSERT_ROWS")
    {
        return (StatusCode::BAD_REQUEST, "unexpected append").into_response();
    }
    let rows: Vec<Vec<Value>> = serde_json::from_value(body["values"].clone()).unwrap_or_default();
    state.log_rows.lock().unwrap().extend(rows);
    Json(json!({"updates": {"updatedRows": 1}})).into_response()
}

async fn spreadsheet_get(
    State(state): State<Arc<FakeGoogleState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("GET spreadsheet {}", id));
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    Json(json!({
        "sheets": [
            {"properties": {"sheetId": 0, "title": "Dataset"}},
            {"properties": {"sheetId": FORM_GID, "title": "Lembar"}},
            {"properties": {"sheetId": 3, "title": "Page"}},
        ]
    }))
    .into_response()
}

async fn spreadsheet_batch_update(
    State(state): State<Arc<FakeGoogleState>>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(format!("POST spreadsheet {}", segment));
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    if segment != format!("{}:batchUpdate", SPREADSHEET_ID) {
        return (StatusCode::NOT_FOUND, "unknown spreadsheet action").into_response();
    }
    let props = &body["requests"][0]["updateSheetProperties"];
    if props["properties"]["sheetId"] != json!(FORM_GID) || props["fields"] != json!("hidden") {
        return (StatusCode::BAD_REQUEST, "unexpected batchUpdate").into_response();
    }
    let hidden = props["properties"]["hidden"].as_bool().unwrap_or(false);
    *state.form_hidden.lock().unwrap() = hidden;
    state.visibility_changes.lock().unwrap().push(hidden);
    Json(json!({"replies": [{}]})).into_response()
}

async fn export(
    State(state): State<Arc<FakeGoogleState>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("GET export {}", params.get("range").cloned().unwrap_or_default()));
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    if id != SPREADSHEET_ID || params.get("format").map(String::as_str) != Some("pdf") {
        return (StatusCode::BAD_REQUEST, "bad export request").into_response();
    }
    if state.fail_export.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "export failed").into_response();
    }
    state.exports.lock().unwrap().push(params);
    (
        [("content-type", "application/pdf")],
        Bytes::from_static(b"%PDF-1.4\n%fake document\n"),
    )
        .into_response()
}

/// Split a multipart/related body into its metadata JSON and payload size
fn parse_multipart(body: &[u8]) -> Option<(Value, usize)> {
    let text = String::from_utf8_lossy(body);
    let mut parts = text.split("\r\n\r\n");
    parts.next()?;
    let metadata_part = parts.next()?;
    let metadata_end = metadata_part.find("\r\n--")?;
    let metadata: Value = serde_json::from_str(&metadata_part[..metadata_end]).ok()?;
    let payload = parts.next()?;
    let payload_end = payload.find("\r\n--")?;
    let pdf = &payload[..payload_end];
    pdf.starts_with("%PDF").then_some((metadata, pdf.len()))
}

async fn drive_upload(
    State(state): State<Arc<FakeGoogleState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record("POST upload".to_string());
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if params.get("uploadType").map(String::as_str) != Some("multipart")
        || !content_type.starts_with("multipart/related; boundary=")
    {
        return (StatusCode::BAD_REQUEST, "expected multipart upload").into_response();
    }
    let Some((metadata, pdf_bytes)) = parse_multipart(&body) else {
        return (StatusCode::BAD_REQUEST, "malformed multipart body").into_response();
    };

    let mut uploads = state.uploads.lock().unwrap();
    let id = format!("file-{}", uploads.len() + 1);
    uploads.push(Upload {
        id: id.clone(),
        name: metadata["name"].as_str().unwrap_or_default().to_string(),
        parents: serde_json::from_value(metadata["parents"].clone()).unwrap_or_default(),
        mime_type: metadata["mimeType"].as_str().unwrap_or_default().to_string(),
        pdf_bytes,
    });
    Json(json!({"id": id, "webViewLink": format!("https://drive.example/{}", id)})).into_response()
}

async fn oauth_token(
    State(state): State<Arc<FakeGoogleState>>,
    axum::Form(form): axum::Form<HashMap<String, String>>,
) -> Response {
    state.record("POST token".to_string());
    state.token_grants.lock().unwrap().push(form);
    Json(json!({"access_token": ACCESS_TOKEN, "expires_in": 3600, "token_type": "Bearer"}))
        .into_response()
}

async fn metadata_token(State(state): State<Arc<FakeGoogleState>>, headers: HeaderMap) -> Response {
    state.record("GET metadata token".to_string());
    if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
        return (StatusCode::FORBIDDEN, "missing Metadata-Flavor").into_response();
    }
    Json(json!({"access_token": ACCESS_TOKEN, "expires_in": 3600, "token_type": "Bearer"}))
        .into_response()
}

/// Start the fake on an ephemeral port with the sample dataset loaded
pub async fn start_fake_google() -> Result<FakeGoogle> {
    let state = Arc::new(FakeGoogleState::default());
    state.set_dataset(sample_dataset());
    *state.form_hidden.lock().unwrap() = true;

    let app = Router::new()
        .route(
            "/v4/spreadsheets/{id}/values/{range}",
            get(values_get).post(values_append),
        )
        .route(
            "/v4/spreadsheets/{id}",
            get(spreadsheet_get).post(spreadsheet_batch_update),
        )
        .route("/spreadsheets/d/{id}/export", get(export))
        .route("/upload/drive/v3/files", post(drive_upload))
        .route("/token", post(oauth_token))
        .route(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            get(metadata_token),
        )
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok(FakeGoogle {
        base_url,
        state,
        handle,
    })
}

pub struct TestApp {
    pub base_url: String,
    pub services: Services,
    handle: JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start the real server against `google`; no snapshot is loaded yet
pub async fn start_test_server(google: &FakeGoogle) -> Result<TestApp> {
    let config = google.app_config();
    let services = initialize_services(&config)?;
    let server = Server::new(
        &services,
        ServerConfig {
            version: "test".to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            refresh_interval_seconds: config.refresh_interval.as_secs(),
        },
    );
    let app = server.router();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok(TestApp {
        base_url,
        services,
        handle,
    })
}

/// Server with the sample dataset already loaded
pub async fn start_loaded_server(google: &FakeGoogle) -> Result<TestApp> {
    let app = start_test_server(google).await?;
    let outcome = app.services.loader.refresh().await;
    anyhow::ensure!(outcome.is_loaded(), "initial load failed: {:?}", outcome);
    Ok(app)
}
