//! Client SDK for the ID Analyzer identity verification service.
//!
//! # Overview
//! Three clients share one request pipeline:
//! - [`CoreApi`] scans a document (plus optional back side, face photo or
//!   face video) and verifies it against configured checks.
//! - [`DocuPass`] creates hosted verification sessions and validates their
//!   callbacks.
//! - [`Vault`] lists, searches and edits stored identity records.
//!
//! # Design
//! - Options are typed structs with wire field names plus an open `extra`
//!   map, so any API parameter can still be set by name.
//! - Every operation is available as `build_*` (produces an
//!   [`HttpRequest`]) and `parse_*` (consumes an [`HttpResponse`]) so the
//!   host can run the HTTP round-trip itself. The one-call methods go
//!   through a [`Transport`]; [`UreqTransport`] is the default.
//! - Local validation fails before any request is built.
//! - Remote `error` objects are either returned as data or raised as
//!   [`ApiError::Remote`], chosen once per client through [`ErrorMode`].
//!
//! ```no_run
//! use idanalyzer_core::{ClientConfig, CoreApi, ErrorMode, ScanInput, VerificationOptions};
//!
//! # fn main() -> Result<(), idanalyzer_core::ApiError> {
//! let config = ClientConfig::new("your-api-key")?.with_error_mode(ErrorMode::Raise);
//! let mut api = CoreApi::new(config);
//! api.verify_dob("1990/01/01")?;
//! let result = api.scan(&ScanInput::new("https://example.com/id.jpg"))?;
//! println!("{}", result["result"]["firstName"]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod core_api;
pub mod docupass;
pub mod error;
pub mod http;
pub mod input;
pub mod options;
pub mod validate;
pub mod vault;

pub use client::{ApiClient, JsonObject};
pub use config::{ClientConfig, ErrorMode, Region};
pub use core_api::{Accuracy, CoreApi, OutputFormat, ScanInput, ScanOptions};
pub use docupass::{DocuPass, FaceVerification, SessionKind, SessionOptions};
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse, Transport};
#[cfg(feature = "ureq-transport")]
pub use http::UreqTransport;
pub use options::{AuthModule, IdentityChecks, VerificationOptions};
pub use vault::{ImageType, ListQuery, SortDirection, Vault, VaultRequest};
