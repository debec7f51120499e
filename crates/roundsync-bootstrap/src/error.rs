//! Bootstrap error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API error: {error} ({hint})")]
    Api { error: String, hint: String },

    #[error("Response carried no data")]
    MissingData,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
