//! Global constants: binary identity, sheet layout, dataset columns, export layouts and Google endpoints
// Constants for version and binary identification
use std::time::Duration;

/// Binary name used in user agents and the startup banner
pub const BINARY_NAME: &str = "debitur-print";

/// Package version from Cargo.toml (set at compile time)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the user agent string for HTTP requests
pub fn user_agent() -> String {
    format!("{}/{}", BINARY_NAME, VERSION)
}

// ============================================================================
// Spreadsheet Layout Defaults
// ============================================================================

/// Spreadsheet holding the dataset, the printable form and the print log
pub const DEFAULT_SPREADSHEET_ID: &str = "1S8oHwZ839_cfFq1o1dK82HW9fCScntawCqX1zXPy15k";

/// Drive folder receiving the generated PDFs
pub const DEFAULT_DRIVE_FOLDER_ID: &str = "1l8snVmCcBUiM1WzibJIZpeOi-pOTVeum";

/// Printable form sheet (kept hidden outside of exports)
pub const DEFAULT_FORM_SHEET: &str = "Lembar";

/// Historical dataset sheet
pub const DEFAULT_DATASET_SHEET: &str = "Dataset";

/// Print log sheet
pub const DEFAULT_LOG_SHEET: &str = "Page";

/// Cell on the form sheet whose value is appended to PDF filenames
pub const DEFAULT_SUFFIX_CELL: &str = "J66";

/// Dataset columns read on every refresh (header row excluded)
pub const DATASET_COLUMNS: &str = "A2:AB";

/// Delivery status written to every log row
pub const LOG_DELIVERY_STATUS: &str = "Delivered";

// ============================================================================
// Dataset Columns (0-based)
// ============================================================================

pub const COL_CATEGORY: usize = 0;
pub const COL_APPLICATION_ID: usize = 1;
pub const COL_BORROWER: usize = 2;
pub const COL_INSTALLMENT_LABEL: usize = 8;
pub const COL_INSTALLMENT: usize = 9;
pub const COL_COLLECTION_UID: usize = 10;
pub const COL_OVERDUE_NOW: usize = 12;
pub const COL_TOTAL_OVERDUE: usize = 13;
pub const COL_OS_PRINCIPAL: usize = 14;
pub const COL_STATUS: usize = 15;

/// Borrower category left out of the borrower picker
pub const EXCLUDED_CATEGORY: &str = "Heavy Equipment";

// ============================================================================
// Refresh
// ============================================================================

/// Default interval between background dataset reloads
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Shown to callers while the first snapshot is still loading
pub const NOT_READY_MESSAGE: &str = "Please wait while data is loading...";

// ============================================================================
// PDF Export
// ============================================================================

/// Fixed page layout passed to the spreadsheet export endpoint
pub const PDF_EXPORT_OPTIONS: &[(&str, &str)] = &[
    ("format", "pdf"),
    ("size", "A4"),
    ("portrait", "true"),
    ("fitw", "true"),
    ("top_margin", "0.5"),
    ("right_margin", "0.7"),
    ("bottom_margin", "0.5"),
    ("left_margin", "0.7"),
    ("sheetnames", "false"),
    ("printtitle", "false"),
    ("pagenumbers", "false"),
    ("gridlines", "false"),
    ("fzr", "false"),
];

/// Timestamp layout embedded in PDF filenames (`20240131_09.05`)
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H.%M";

// ============================================================================
// Google Endpoints
// ============================================================================

pub const GOOGLE_SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";
pub const GOOGLE_DOCS_URL: &str = "https://docs.google.com";
pub const GOOGLE_DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
pub const GOOGLE_DRIVE_VIEW_URL: &str = "https://drive.google.com";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

/// OAuth scopes requested for the service account
pub const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Tokens are refreshed this long before they expire
pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ============================================================================
// Timeouts (in seconds)
// ============================================================================

/// HTTP request timeout for Google API calls
pub const HTTP_TIMEOUT_SECS: u64 = 60;
