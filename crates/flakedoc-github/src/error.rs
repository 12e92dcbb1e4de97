//! Error types for the GitHub adapters

use flakedoc_core::evidence::ProviderError;
use thiserror::Error;

/// Errors that can occur talking to the GitHub REST API
#[derive(Error, Debug)]
pub enum GithubError {
    /// Transport-level failure (connect, timeout, TLS, status)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not match the expected shape
    #[error("Unexpected API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GithubError::Decode(err.to_string())
        } else {
            GithubError::Http(err.to_string())
        }
    }
}

impl From<GithubError> for ProviderError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Http(msg) => ProviderError::Unavailable(msg),
            GithubError::Decode(msg) => ProviderError::Malformed(msg),
        }
    }
}
