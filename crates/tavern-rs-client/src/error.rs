//! Error types for client construction and credential storage.

use thiserror::Error;

/// Errors building the HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Errors reading or writing the stored credential.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to access credential file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode credential file: {0}")]
    Decode(#[from] serde_json::Error),
}
