//! Client credentials, regional endpoint and remote-error mode.
//!
//! # Design
//! A `ClientConfig` is fixed when a client is constructed. The error mode in
//! particular is not a runtime toggle: two callers sharing a client always
//! observe the same remote-error behavior.
//!
//! Any region string other than `US` or `EU` is taken as a literal endpoint.
//! This is intentional and lets callers point the SDK at a proxy or a mock
//! server without another knob.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const US_ENDPOINT: &str = "https://api.idanalyzer.com/";
pub const EU_ENDPOINT: &str = "https://api-eu.idanalyzer.com/";

/// Identifier sent in the `client` field of every payload.
pub const SDK_CLIENT_ID: &str = "rust-sdk";

pub const ENV_API_KEY: &str = "IDANALYZER_API_KEY";
pub const ENV_REGION: &str = "IDANALYZER_REGION";
pub const ENV_RAISE_ERRORS: &str = "IDANALYZER_RAISE_ERRORS";

/// Where requests are sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Region {
    #[default]
    Us,
    Eu,
    /// A literal base endpoint, e.g. `http://127.0.0.1:3000/`.
    Custom(String),
}

impl Region {
    /// Base endpoint, always ending with `/`.
    pub fn endpoint(&self) -> String {
        match self {
            Region::Us => US_ENDPOINT.to_string(),
            Region::Eu => EU_ENDPOINT.to_string(),
            Region::Custom(url) if url.ends_with('/') => url.clone(),
            Region::Custom(url) => format!("{url}/"),
        }
    }
}

impl From<&str> for Region {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "us" => Region::Us,
            "eu" => Region::Eu,
            _ => Region::Custom(s.to_string()),
        }
    }
}

impl From<String> for Region {
    fn from(s: String) -> Self {
        Region::from(s.as_str())
    }
}

impl From<Region> for String {
    fn from(r: Region) -> Self {
        r.to_string()
    }
}

impl FromStr for Region {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Region::from(s))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Us => write!(f, "US"),
            Region::Eu => write!(f, "EU"),
            Region::Custom(url) => write!(f, "{url}"),
        }
    }
}

/// What a client does with an `error` object in a successful HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Hand the response body back unchanged.
    #[default]
    ReturnBody,
    /// Fail with `ApiError::Remote` carrying the server's code and message.
    Raise,
}

/// Credentials and endpoint shared by every request of one client.
///
/// Deserialized configs go through [`ClientConfig::new`], so an empty key is
/// rejected however the config is built.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClientConfig")]
pub struct ClientConfig {
    api_key: String,
    pub region: Region,
    pub error_mode: ErrorMode,
}

#[derive(Deserialize)]
struct RawClientConfig {
    api_key: String,
    #[serde(default)]
    region: Region,
    #[serde(default)]
    error_mode: ErrorMode,
}

impl TryFrom<RawClientConfig> for ClientConfig {
    type Error = ApiError;

    fn try_from(raw: RawClientConfig) -> Result<Self, Self::Error> {
        Ok(ClientConfig::new(raw.api_key)?
            .with_region(raw.region)
            .with_error_mode(raw.error_mode))
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ApiError::validation("Please provide an API key"));
        }
        Ok(Self {
            api_key,
            region: Region::default(),
            error_mode: ErrorMode::default(),
        })
    }

    pub fn with_region(mut self, region: impl Into<Region>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Read `IDANALYZER_API_KEY`, `IDANALYZER_REGION` and
    /// `IDANALYZER_RAISE_ERRORS` from the environment.
    pub fn from_env() -> Result<Self, ApiError> {
        let api_key = std::env::var(ENV_API_KEY).unwrap_or_default();
        let region = std::env::var(ENV_REGION).unwrap_or_else(|_| "US".to_string());
        let raise = std::env::var(ENV_RAISE_ERRORS)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let mode = if raise {
            ErrorMode::Raise
        } else {
            ErrorMode::ReturnBody
        };
        Ok(Self::new(api_key)?.with_region(region).with_error_mode(mode))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Full URL for an action path such as `vault/list`.
    pub fn url_for(&self, action: &str) -> String {
        format!("{}{}", self.region.endpoint(), action)
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .field("error_mode", &self.error_mode)
            .finish()
    }
}
