//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. Every client operation is split
//! into a `build_*` step producing an `HttpRequest` and a `parse_*` step
//! consuming an `HttpResponse`, so a host (or the C FFI) can perform the
//! round-trip itself. For Rust callers the `Transport` trait closes the loop:
//! the convenience methods on each client build, execute and parse in one go.
//!
//! The remote API only ever receives a JSON object via `POST`, so requests
//! carry no method field.

use crate::error::ApiError;

/// A JSON `POST` request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A response with no headers, mostly useful to hosts and tests.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Executes one request and returns its response.
///
/// Implementations must return non-2xx responses as data rather than as
/// `Err`; status interpretation belongs to the clients.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[cfg(feature = "ureq-transport")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq-transport")]
mod ureq_transport {
    use std::time::Duration;

    use tracing::debug;

    use super::{HttpRequest, HttpResponse, Transport};
    use crate::error::ApiError;

    /// Blocking transport backed by `ureq`.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            Self::build(None)
        }

        /// Bound each request (connect, send and receive) by `timeout`.
        pub fn with_timeout(timeout: Duration) -> Self {
            Self::build(Some(timeout))
        }

        fn build(timeout: Option<Duration>) -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(timeout)
                .build()
                .new_agent();
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            let mut builder = self.agent.post(&request.url);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            let mut response = builder
                .send(request.body.as_bytes())
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
                .collect();
            // ureq caps bodies at 10 MiB by default; inline base64 images exceed it
            let body = response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_string()
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            debug!(url = %request.url, status, "request completed");
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(all(test, feature = "ureq-transport"))]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Serve one request with a `200` response carrying `body`.
    fn serve_once(body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
                if line == "\r\n" {
                    break;
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body.as_bytes()).unwrap();
        });
        format!("http://{addr}/")
    }

    #[test]
    fn large_response_body_is_read_in_full() {
        let image = "A".repeat(11 * 1024 * 1024);
        let body = format!(r#"{{"cropped":"{image}"}}"#);
        let url = serve_once(body.clone());

        let request = HttpRequest {
            url,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: "{}".to_string(),
        };
        let response = UreqTransport::new().execute(&request).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), body.len());
    }
}
