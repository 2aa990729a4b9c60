//! Request building and response parsing shared by every client.
//!
//! # Design
//! `ApiClient` holds the immutable `ClientConfig` and an optional transport.
//! `build` turns an action path and a flat payload into an `HttpRequest`,
//! `parse` turns an `HttpResponse` into the response object, and `call`
//! chains both through the transport. The facades (`CoreApi`, `DocuPass`,
//! `Vault`) only decide which fields go into the payload.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::config::{ClientConfig, ErrorMode};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Payload and response objects are flat JSON objects.
pub type JsonObject = Map<String, Value>;

#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl ApiClient {
    /// A client using the default transport, if one is compiled in.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: default_transport(),
        }
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport: Some(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Serialize `payload` plus the API key into a `POST` to `action`.
    pub fn build(&self, action: &str, mut payload: JsonObject) -> Result<HttpRequest, ApiError> {
        payload.insert(
            "apikey".to_string(),
            Value::String(self.config.api_key().to_string()),
        );
        let body = serde_json::to_string(&payload)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        debug!(action, fields = payload.len(), "built request");
        Ok(HttpRequest {
            url: self.config.url_for(action),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        })
    }

    /// Decode a response body, applying this client's `ErrorMode`.
    pub fn parse(&self, response: HttpResponse) -> Result<Value, ApiError> {
        let body = parse_object(response)?;
        if let Some((code, message)) = remote_error(&body) {
            warn!(code, %message, "API returned an error");
            if self.config.error_mode == ErrorMode::Raise {
                return Err(ApiError::Remote { code, message });
            }
        }
        Ok(body)
    }

    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        match &self.transport {
            Some(transport) => transport.execute(request),
            None => Err(ApiError::Transport("no transport configured".to_string())),
        }
    }

    /// Build, send and parse in one step.
    #[instrument(skip_all, fields(action = %action))]
    pub fn call(&self, action: &str, payload: JsonObject) -> Result<Value, ApiError> {
        let request = self.build(action, payload)?;
        let response = self.send(&request)?;
        self.parse(response)
    }
}

#[cfg(feature = "ureq-transport")]
fn default_transport() -> Option<Arc<dyn Transport>> {
    Some(Arc::new(crate::http::UreqTransport::new()))
}

#[cfg(not(feature = "ureq-transport"))]
fn default_transport() -> Option<Arc<dyn Transport>> {
    None
}

/// Map non-success status codes to `HttpError`, then require a JSON object.
pub(crate) fn parse_object(response: HttpResponse) -> Result<Value, ApiError> {
    check_status(&response)?;
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    if !value.is_object() {
        return Err(ApiError::DeserializationError(
            "expected a JSON object".to_string(),
        ));
    }
    Ok(value)
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Extract `error.code` / `error.message` from a response object.
///
/// The code is accepted as a JSON number or a numeric string; anything else
/// is reported as `0`.
pub fn remote_error(body: &Value) -> Option<(i64, String)> {
    let error = body.get("error")?;
    let code = match error.get("code") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, message))
}
