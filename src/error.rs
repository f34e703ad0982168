use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store query failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed store response: {0}")]
    Malformed(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
