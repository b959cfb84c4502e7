//! Error types for the site deployment server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the site deployment server
#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Missing secret, missing `.env` file or bad settings
    #[error("{0}")]
    ConfigError(String),

    #[error("{0}")]
    AuthError(String),

    #[error("{0}")]
    InsufficientStorage(String),

    #[error("{0}")]
    ExtractionError(String),

    /// Key generation already running, or a key already exists
    #[error("{0}")]
    Rejected(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SiteError {
    /// HTTP status the error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            SiteError::AuthError(_) | SiteError::Rejected(_) => StatusCode::UNAUTHORIZED,
            SiteError::InsufficientStorage(_) => StatusCode::INSUFFICIENT_STORAGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<zip::result::ZipError> for SiteError {
    fn from(err: zip::result::ZipError) -> Self {
        SiteError::ExtractionError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SiteError {
    fn from(err: tokio::task::JoinError) -> Self {
        SiteError::Internal(err.to_string())
    }
}
