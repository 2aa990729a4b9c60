//! Resolution of image/video arguments into payload fields.
//!
//! An argument is either a remote URL, which the server downloads itself, or
//! a local file path whose contents are embedded as base64. Each logical
//! input is sent under one of two field names depending on which it was.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ApiError;
use crate::validate::is_valid_url;

/// A resolved input, ready to be placed in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedInput {
    Url(String),
    Base64(String),
}

/// The URL and base64 field names of one logical input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputField {
    pub url_key: &'static str,
    pub base64_key: &'static str,
    /// Used in validation messages, e.g. "primary document image".
    pub label: &'static str,
}

pub const DOCUMENT_PRIMARY: InputField = InputField {
    url_key: "url",
    base64_key: "file_base64",
    label: "primary document image",
};

pub const DOCUMENT_SECONDARY: InputField = InputField {
    url_key: "url_back",
    base64_key: "file_back_base64",
    label: "secondary document image",
};

pub const FACE_PHOTO: InputField = InputField {
    url_key: "faceurl",
    base64_key: "face_base64",
    label: "face image",
};

pub const FACE_VIDEO: InputField = InputField {
    url_key: "videourl",
    base64_key: "video_base64",
    label: "face video",
};

pub const VAULT_IMAGE: InputField = InputField {
    url_key: "imageurl",
    base64_key: "image",
    label: "image",
};

/// Classify `input` as a URL or an existing local file.
///
/// URLs win over paths. Anything that is neither fails with
/// `ApiError::Validation` without touching the network.
pub fn resolve(input: &str, label: &str) -> Result<ResolvedInput, ApiError> {
    if is_valid_url(input) {
        return Ok(ResolvedInput::Url(input.to_string()));
    }
    let path = Path::new(input);
    if !input.is_empty() && path.is_file() {
        let bytes = std::fs::read(path).map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(label, len = bytes.len(), "embedding local file");
        return Ok(ResolvedInput::Base64(STANDARD.encode(bytes)));
    }
    Err(ApiError::validation(format!(
        "Invalid {label}, file not found or malformed URL."
    )))
}

impl InputField {
    /// Resolve `input` and insert it into `payload` under the matching key.
    pub(crate) fn insert(&self, payload: &mut Map<String, Value>, input: &str) -> Result<(), ApiError> {
        match resolve(input, self.label)? {
            ResolvedInput::Url(url) => payload.insert(self.url_key.to_string(), Value::String(url)),
            ResolvedInput::Base64(data) => {
                payload.insert(self.base64_key.to_string(), Value::String(data))
            }
        };
        Ok(())
    }
}
