// Caller-visible error taxonomy shared by queries and the export workflow
use crate::constants;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or invalid caller input; nothing external was contacted
    #[error("{0}")]
    BadRequest(String),

    /// Valid input that is absent from the current snapshot
    #[error("{0}")]
    NotFound(String),

    /// No snapshot has been loaded yet
    #[error("{}", constants::NOT_READY_MESSAGE)]
    NotReady,

    /// An external Google call failed
    #[error("upstream failure: {0:#}")]
    Upstream(anyhow::Error),
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<crate::export::ExportError> for ServiceError {
    fn from(e: crate::export::ExportError) -> Self {
        use crate::export::ExportError;
        match e {
            ExportError::Invalid(message) => Self::BadRequest(message),
            e @ ExportError::InvalidType(_) => Self::BadRequest(e.to_string()),
            e @ ExportError::Upstream { .. } => Self::Upstream(anyhow::Error::new(e)),
        }
    }
}
