//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Requests leave as plain C data (`FfiHttpRequest`); responses come back as
//! `FfiHttpResponse`. Every fallible call returns one `FfiResult` envelope
//! whose `data_tag` says what `data` points to. Parsed API responses cross
//! the boundary as JSON text, so the C side needs no knowledge of the
//! response schema.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use idanalyzer_core::{ApiError, CoreApi, DocuPass, Vault};

/// Opaque handle to a Core API client.
pub struct FfiCoreClient {
    pub(crate) inner: CoreApi,
}

/// Opaque handle to a DocuPass client.
pub struct FfiDocuPassClient {
    pub(crate) inner: DocuPass,
}

/// Opaque handle to a Vault client.
pub struct FfiVaultClient {
    pub(crate) inner: Vault,
}

/// Copy `s` into a C string owned by the caller.
///
/// JSON text and URLs never contain NUL; should one appear the string is
/// truncated at it rather than dropped.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let bytes: Vec<u8> = s.into_bytes().into_iter().take_while(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A `POST` request described as C-compatible plain data.
///
/// The C caller sends `body` to `url` with `headers`, then passes the
/// response back through the matching `ida_*_parse_*` function.
#[repr(C)]
pub struct FfiHttpRequest {
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: idanalyzer_core::HttpRequest) -> *mut Self {
        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Vec<FfiHeader> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            // boxed slice so capacity == len when rebuilt in `free`
            Box::into_raw(ffi_headers.into_boxed_slice()) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            url: into_c_string(req.url),
            headers,
            headers_len,
            body: into_c_string(req.body),
        }))
    }

    /// Release a request created by `from_core`, including its strings.
    ///
    /// # Safety
    /// `req` must come from `from_core` and not have been freed.
    pub(crate) unsafe fn free(req: *mut Self) {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(req.headers, req.headers_len as usize);
            let headers = unsafe { Box::from_raw(slice) };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    }
}

pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this after executing a request. The FFI layer
/// reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

/// Error categories reported in `FfiResult::error_code`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Validation = 1,
    Io = 2,
    Transport = 3,
    Http = 4,
    Remote = 5,
    Deserialization = 6,
    Serialization = 7,
    Panic = 8,
    NullArg = 9,
}

impl From<&ApiError> for FfiErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Validation(_) => FfiErrorCode::Validation,
            ApiError::Io { .. } => FfiErrorCode::Io,
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::HttpError { .. } => FfiErrorCode::Http,
            ApiError::Remote { .. } => FfiErrorCode::Remote,
            ApiError::DeserializationError(_) => FfiErrorCode::Deserialization,
            ApiError::SerializationError(_) => FfiErrorCode::Serialization,
        }
    }
}

/// Tag that tells `ida_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a NUL-terminated JSON document.
    Json = 1,
    /// `data` is an `FfiHttpRequest`.
    Request = 2,
}

/// Result envelope for every build and parse operation.
///
/// On success `error_code` is `Ok`, `error_message` is null and `data`
/// points to the payload named by `data_tag`. On failure `data` is null and
/// `error_message` holds a description; `http_status` is set for HTTP
/// errors and `remote_code` for errors reported by the API.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub remote_code: i64,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn boxed(self) -> *mut Self {
        Box::into_raw(Box::new(self))
    }

    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            remote_code: 0,
            data_tag,
            data,
        }
        .boxed()
    }

    fn failure(error_code: FfiErrorCode, msg: String) -> FfiResult {
        FfiResult {
            error_code,
            error_message: into_c_string(msg),
            http_status: 0,
            remote_code: 0,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }
    }

    pub(crate) fn ok_request(req: idanalyzer_core::HttpRequest) -> *mut Self {
        Self::ok(FfiDataTag::Request, FfiHttpRequest::from_core(req) as *mut c_void)
    }

    pub(crate) fn ok_json(value: &serde_json::Value) -> *mut Self {
        Self::ok(FfiDataTag::Json, into_c_string(value.to_string()) as *mut c_void)
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let mut result = Self::failure(FfiErrorCode::from(&err), err.to_string());
        match &err {
            ApiError::HttpError { status, .. } => result.http_status = *status,
            ApiError::Remote { code, .. } => result.remote_code = *code,
            _ => {}
        }
        result.boxed()
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, format!("null argument: {name}")).boxed()
    }

    pub(crate) fn invalid_json(name: &str, err: serde_json::Error) -> *mut Self {
        Self::failure(FfiErrorCode::Deserialization, format!("invalid {name}: {err}")).boxed()
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg.to_string()).boxed()
    }

    /// Release the envelope and whatever `data` points to.
    ///
    /// # Safety
    /// `result` must come from an `FfiResult` constructor and not have been
    /// freed.
    pub(crate) unsafe fn free(result: *mut Self) {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Json => free_c_string(result.data as *mut c_char),
            FfiDataTag::Request => unsafe { FfiHttpRequest::free(result.data as *mut FfiHttpRequest) },
            FfiDataTag::None => {}
        }
    }
}
