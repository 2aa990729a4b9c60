//! Error types for the ID Analyzer client.
//!
//! # Design
//! Errors fall into three families that callers usually handle differently:
//! local precondition failures (`Validation`, `Io`) raised before any request
//! is sent, transport failures (`Transport`, `HttpError`) and remote
//! application errors (`Remote`). `Remote` is only produced by clients built
//! with `ErrorMode::Raise`; otherwise the server's error object is returned
//! to the caller as the raw response body.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the Core API, DocuPass and Vault clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An input failed local validation. No request was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A local file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The server reported an application error (only in `ErrorMode::Raise`).
    #[error("API error {code}: {message}")]
    Remote { code: i64, message: String },

    /// The response body is not a JSON object.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    /// The server's numeric error code, if this is a remote error.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            ApiError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
