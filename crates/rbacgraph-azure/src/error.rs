//! Azure client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Azure API error ({status}) for {url}: {body}")]
    Api {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Unexpected Azure response: {0}")]
    Decode(String),

    #[error("Token request failed ({status}): {body}")]
    Token {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for Azure operations.
pub type AzureResult<T> = Result<T, AzureError>;
