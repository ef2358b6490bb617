// Server configuration

#[derive(Clone)]
pub struct ServerConfig {
    pub version: String,
    pub spreadsheet_id: String,
    pub refresh_interval_seconds: u64,
}
