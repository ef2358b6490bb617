// src/lib.rs
//! Borrower (debitur) lookup and letter printing over a Google spreadsheet.
//!
//! A background task keeps an in-memory snapshot of the dataset sheet; the
//! HTTP server answers borrower queries from it and runs the print workflow
//! (log entry, PDF export, Drive upload) against the live spreadsheet.

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod google;
pub mod index;
pub mod query;
pub mod runtime;
pub mod server;

pub use cache::{DatasetCache, DatasetLoader, RefreshOutcome};
pub use config::{AppConfig, CredentialSource};
pub use error::ServiceError;
pub use export::{DocumentType, ExportError, ExportJob, ExportReceipt, ExportStage, ExportWorkflow};
pub use index::{RecordRow, Snapshot};
pub use query::{BorrowerDetail, HistoryRow, QueryService};
pub use runtime::ServiceRuntime;
