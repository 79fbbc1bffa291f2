//! Error types for constructing the history client.

use thiserror::Error;

/// Errors returned while building a client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL is unusable.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// The underlying HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}
