use thiserror::Error;

/// Error type for boundary API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {status}")]
    Status { status: u16 },

    #[error("request rejected by server: {0}")]
    Rejected(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;
