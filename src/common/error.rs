//! Error types shared across the crate.

use thiserror::Error;

use crate::common::dispatch::Retryable;

/// Errors raised while building or using a request signer.
///
/// Both variants indicate misconfiguration and are never retried.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("Missing API credentials: {0}")]
    CredentialMissing(&'static str),

    #[error("Failed to sign request: {0}")]
    SigningFailure(String),
}

pub type SignResult<T> = Result<T, SignError>;

/// Errors raised while assembling `AppConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the outbound HTTP clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned status {status} with body: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Sign(#[from] SignError),
}

impl Retryable for ClientError {
    fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(e) => !(e.is_decode() || e.is_builder()),
            ClientError::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            ClientError::InvalidUrl(_) | ClientError::Sign(_) => false,
        }
    }
}
