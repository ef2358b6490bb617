// src/export.rs
//! Print workflow: log the letter, export the form range as PDF, archive it to Drive.
//!
//! The steps run strictly in order and each depends on the previous one:
//!
//! ```text
//! Validating -> LoggingEntry -> ResolvingFilename -> Unhiding -> Exporting
//!            -> Uploading -> RespondingSuccess -> Rehiding (best effort)
//! ```
//!
//! Nothing is rolled back. A log row appended before a later failure stays in
//! the log sheet. The form sheet is the one exception: once it has been made
//! visible, a [`VisibilityGuard`] hides it again whatever happens next.
use crate::config::sheet_range;
use crate::constants;
use crate::google::{FileStorage, SpreadsheetService, StoredFile};
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio_util::task::TaskTracker;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Printable documents and where they live on the form sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    WarningLetter,
    CustomerCard,
    Repossession,
}

impl DocumentType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "suratPeringatan" => Some(Self::WarningLetter),
            "customerCard" => Some(Self::CustomerCard),
            "reposition" => Some(Self::Repossession),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WarningLetter => "suratPeringatan",
            Self::CustomerCard => "customerCard",
            Self::Repossession => "reposition",
        }
    }

    /// Cell range exported for this document
    pub fn range(&self) -> &'static str {
        match self {
            Self::WarningLetter => "B1:J63",
            Self::CustomerCard => "L1:X80",
            Self::Repossession => "AF1:AN60",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::WarningLetter => "SP",
            Self::CustomerCard => "CC",
            Self::Repossession => "REPO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Validating,
    LoggingEntry,
    ResolvingFilename,
    Unhiding,
    Exporting,
    Uploading,
    RespondingSuccess,
    Rehiding,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::LoggingEntry => "logging entry",
            Self::ResolvingFilename => "resolving filename",
            Self::Unhiding => "unhiding sheet",
            Self::Exporting => "exporting PDF",
            Self::Uploading => "uploading PDF",
            Self::RespondingSuccess => "responding",
            Self::Rehiding => "rehiding sheet",
        };
        f.write_str(name)
    }
}

/// Accept strings, numbers or booleans from the form; blank becomes `None`
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Form fields submitted with a print request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportJob {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub document_type: Option<String>,
    #[serde(rename = "nomorSurat", default, deserialize_with = "lenient_text")]
    pub letter_number: Option<String>,
    #[serde(rename = "printedDate", default, deserialize_with = "lenient_text")]
    pub printed_date: Option<String>,
    #[serde(rename = "debitur", default, deserialize_with = "lenient_text")]
    pub borrower: Option<String>,
    #[serde(rename = "angsuranKe", default, deserialize_with = "lenient_text")]
    pub installment_ref: Option<String>,
    #[serde(rename = "idAplikasi", default, deserialize_with = "lenient_text")]
    pub application_id: Option<String>,
    #[serde(rename = "uidCollection", default, deserialize_with = "lenient_text")]
    pub collection_uid: Option<String>,
    #[serde(rename = "angsuran", default, deserialize_with = "lenient_text")]
    pub installment: Option<String>,
    #[serde(rename = "totalOverdue", default, deserialize_with = "lenient_text")]
    pub total_overdue: Option<String>,
    #[serde(rename = "debiturStatus", default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(rename = "peringatanLevel", default, deserialize_with = "lenient_text")]
    pub warning_level: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

impl ExportJob {
    /// Required-field and document-type checks; runs before any external call
    pub fn validate(&self) -> Result<DocumentType, ExportError> {
        if present(&self.letter_number).is_none()
            || present(&self.printed_date).is_none()
            || present(&self.borrower).is_none()
        {
            return Err(ExportError::Invalid(
                "Nomor Surat, Printed Date, and Debitur are required".to_string(),
            ));
        }
        let kind = self.document_type.as_deref().unwrap_or_default();
        DocumentType::parse(kind).ok_or_else(|| ExportError::InvalidType(kind.to_string()))
    }

    fn borrower_name(&self) -> &str {
        self.borrower.as_deref().unwrap_or_default()
    }

    /// Log sheet row: number, type, level, application, borrower, installment,
    /// print date, letter number, delivery status
    fn log_row(&self, row_number: usize) -> Vec<Value> {
        let text = |field: &Option<String>| field.as_deref().map_or(Value::Null, |s| json!(s));
        vec![
            json!(row_number),
            text(&self.document_type),
            text(&self.warning_level),
            text(&self.application_id),
            text(&self.borrower),
            text(&self.installment_ref),
            text(&self.printed_date),
            text(&self.letter_number),
            json!(constants::LOG_DELIVERY_STATUS),
        ]
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0}")]
    Invalid(String),

    #[error("Invalid type selected")]
    InvalidType(String),

    #[error("{stage} failed: {cause:#}")]
    Upstream {
        stage: ExportStage,
        cause: anyhow::Error,
    },
}

impl ExportError {
    /// Stage at which the workflow stopped
    pub fn stage(&self) -> ExportStage {
        match self {
            Self::Invalid(_) | Self::InvalidType(_) => ExportStage::Validating,
            Self::Upstream { stage, .. } => *stage,
        }
    }
}

fn at(stage: ExportStage) -> impl FnOnce(anyhow::Error) -> ExportError {
    move |cause| ExportError::Upstream { stage, cause }
}

/// Filename suffix from the designated form cell: `_<text>` or empty
pub fn filename_suffix(cell: Option<&Value>) -> String {
    let text = match cell {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let collapsed = WHITESPACE_RUN.replace_all(&text, " ");
    let collapsed = collapsed.trim();
    if collapsed.is_empty() {
        String::new()
    } else {
        format!("_{}", collapsed)
    }
}

/// `<prefix>_<borrower>_<YYYYMMDD_HH.MM><suffix>.pdf`
pub fn pdf_file_name(doc: DocumentType, borrower: &str, at: NaiveDateTime, suffix: &str) -> String {
    format!(
        "{}_{}_{}{}.pdf",
        doc.file_prefix(),
        borrower,
        at.format(constants::FILENAME_TIMESTAMP_FORMAT),
        suffix
    )
}

/// Sheet names and cells the workflow touches
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub form_sheet: String,
    pub log_sheet: String,
    pub suffix_cell: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            form_sheet: constants::DEFAULT_FORM_SHEET.to_string(),
            log_sheet: constants::DEFAULT_LOG_SHEET.to_string(),
            suffix_cell: constants::DEFAULT_SUFFIX_CELL.to_string(),
        }
    }
}

impl ExportSettings {
    fn log_count_range(&self) -> String {
        sheet_range(&self.log_sheet, "A2:A")
    }

    fn log_append_range(&self) -> String {
        sheet_range(&self.log_sheet, "A2")
    }

    fn suffix_range(&self) -> String {
        sheet_range(&self.form_sheet, &self.suffix_cell)
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct ExportReceipt {
    pub document: DocumentType,
    pub file_name: String,
    pub file: StoredFile,
    pub log_row: usize,
}

struct HiddenSheet {
    sheets: Arc<dyn SpreadsheetService>,
    sheet_id: i64,
    title: String,
}

impl HiddenSheet {
    async fn rehide(self) -> anyhow::Result<()> {
        match self.sheets.set_sheet_hidden(self.sheet_id, true).await {
            Ok(()) => {
                log::debug!("[Export] Sheet '{}' hidden again", self.title);
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "[Export] {} failed for '{}' (gid {}): {:#}",
                    ExportStage::Rehiding,
                    self.title,
                    self.sheet_id,
                    e
                );
                Err(e)
            }
        }
    }
}

/// Re-hides the form sheet when released or dropped.
///
/// Dropping without [`release`](Self::release) (an early return, or the
/// request future being cancelled) spawns the re-hide on the current tokio
/// runtime.
#[must_use = "dropping the guard re-hides the sheet immediately"]
pub struct VisibilityGuard {
    pending: Option<HiddenSheet>,
    rehides: TaskTracker,
}

impl fmt::Debug for VisibilityGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityGuard")
            .field("sheet_id", &self.sheet_id())
            .field("title", &self.pending.as_ref().map(|p| p.title.as_str()))
            .finish()
    }
}

impl VisibilityGuard {
    fn new(
        sheets: Arc<dyn SpreadsheetService>,
        sheet_id: i64,
        title: &str,
        rehides: TaskTracker,
    ) -> Self {
        Self {
            pending: Some(HiddenSheet {
                sheets,
                sheet_id,
                title: title.to_string(),
            }),
            rehides,
        }
    }

    pub fn sheet_id(&self) -> Option<i64> {
        self.pending.as_ref().map(|p| p.sheet_id)
    }

    /// Hide the sheet now; failures are logged and returned
    pub async fn release(mut self) -> anyhow::Result<()> {
        match self.pending.take() {
            Some(sheet) => sheet.rehide().await,
            None => Ok(()),
        }
    }

    /// Hide the sheet on a background task (after the response went out).
    ///
    /// The task is tracked by the workflow, see [`ExportWorkflow::wait_for_rehides`].
    pub fn release_in_background(self) {
        let rehides = self.rehides.clone();
        rehides.spawn(async move {
            let _ = self.release().await;
        });
    }
}

impl Drop for VisibilityGuard {
    fn drop(&mut self) {
        let Some(sheet) = self.pending.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.rehides.spawn_on(
                    async move {
                        let _ = sheet.rehide().await;
                    },
                    &handle,
                );
            }
            Err(_) => log::warn!(
                "[Export] No runtime to re-hide sheet '{}'; it stays visible",
                sheet.title
            ),
        }
    }
}

/// Drives one print request through the external services.
///
/// No locking spans requests: two concurrent runs share the form sheet's
/// visibility, so one run's re-hide can land while another is still exporting.
pub struct ExportWorkflow {
    sheets: Arc<dyn SpreadsheetService>,
    storage: Arc<dyn FileStorage>,
    settings: ExportSettings,
    rehides: TaskTracker,
}

impl ExportWorkflow {
    pub fn new(
        sheets: Arc<dyn SpreadsheetService>,
        storage: Arc<dyn FileStorage>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            sheets,
            storage,
            settings,
            rehides: TaskTracker::new(),
        }
    }

    /// Wait for re-hides still running in the background; called on shutdown
    pub async fn wait_for_rehides(&self) {
        if !self.rehides.is_empty() {
            log::info!("[Export] Waiting for {} sheet re-hide(s)", self.rehides.len());
        }
        self.rehides.close();
        self.rehides.wait().await;
    }

    /// Run steps up to the upload, stamping the filename with local time
    pub async fn run(&self, job: &ExportJob) -> Result<(ExportReceipt, VisibilityGuard), ExportError> {
        self.run_at(job, Local::now().naive_local()).await
    }

    /// Run steps up to the upload.
    ///
    /// On success the caller gets the receipt and the guard for the still
    /// visible form sheet; it should respond first and release the guard after.
    pub async fn run_at(
        &self,
        job: &ExportJob,
        now: NaiveDateTime,
    ) -> Result<(ExportReceipt, VisibilityGuard), ExportError> {
        // Type is checked together with the required fields so that an
        // unknown type never reaches the log sheet.
        let doc = job.validate()?;
        let borrower = job.borrower_name();
        log::info!(
            "[Export] {} for '{}' (letter {})",
            doc.as_str(),
            borrower,
            job.letter_number.as_deref().unwrap_or_default()
        );

        let existing = self
            .sheets
            .read_range(&self.settings.log_count_range())
            .await
            .map_err(at(ExportStage::LoggingEntry))?;
        let log_row = existing.len() + 1;
        self.sheets
            .append_row(&self.settings.log_append_range(), job.log_row(log_row))
            .await
            .map_err(at(ExportStage::LoggingEntry))?;
        log::debug!("[Export] Logged as row {}", log_row);

        let suffix_values = self
            .sheets
            .read_range(&self.settings.suffix_range())
            .await
            .map_err(at(ExportStage::ResolvingFilename))?;
        let suffix = filename_suffix(suffix_values.first().and_then(|row| row.first()));
        let file_name = pdf_file_name(doc, borrower, now, &suffix);

        let sheet_id = self
            .sheets
            .sheet_id(&self.settings.form_sheet)
            .await
            .map_err(at(ExportStage::Unhiding))?;
        self.sheets
            .set_sheet_hidden(sheet_id, false)
            .await
            .map_err(at(ExportStage::Unhiding))?;
        let guard = VisibilityGuard::new(
            Arc::clone(&self.sheets),
            sheet_id,
            &self.settings.form_sheet,
            self.rehides.clone(),
        );

        let stored = match self.export_and_upload(sheet_id, doc, &file_name).await {
            Ok(stored) => stored,
            Err(e) => {
                let _ = guard.release().await;
                return Err(e);
            }
        };

        log::info!("[Export] Stored {} as {}", file_name, stored.id);
        Ok((
            ExportReceipt {
                document: doc,
                file_name,
                file: stored,
                log_row,
            },
            guard,
        ))
    }

    async fn export_and_upload(
        &self,
        sheet_id: i64,
        doc: DocumentType,
        file_name: &str,
    ) -> Result<StoredFile, ExportError> {
        let pdf = self
            .sheets
            .export_pdf(sheet_id, doc.range())
            .await
            .map_err(at(ExportStage::Exporting))?;
        log::debug!("[Export] Exported {} ({} bytes)", doc.range(), pdf.len());

        self.storage
            .upload_pdf(file_name, pdf)
            .await
            .map_err(at(ExportStage::Uploading))
    }
}
