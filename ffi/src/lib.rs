//! C-ABI wrapper around `idanalyzer-core`.
//!
//! # Overview
//! Exposes the Core API, DocuPass and Vault clients through `extern "C"`
//! functions. The library never performs network I/O itself: `build`
//! functions hand back an `FfiHttpRequest`, the caller sends it with its own
//! HTTP stack, and `parse` functions turn the response into JSON text.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary. Client handles hold trait objects, so the
//!   closures are wrapped in `AssertUnwindSafe`; a panic leaves the handle
//!   untouched because no entry point mutates it partially.
//! - Structured arguments (scan inputs, vault requests, parameter values)
//!   are passed as JSON strings and deserialized into the core types.
//! - Build and parse operations share one `FfiResult` envelope. The caller
//!   owns every returned pointer and releases it with the matching
//!   `ida_*_free` / `ida_free_result` function.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use idanalyzer_core::{
    ApiError, ClientConfig, CoreApi, DocuPass, ErrorMode, HttpResponse, ScanInput, SessionKind,
    Vault, VaultRequest, VerificationOptions,
};
use serde_json::Value;

use types::*;

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Borrow a C string, or `None` if it is null or not UTF-8.
fn opt_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Borrow a required C string argument; `Err` holds the result to return.
fn arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, *mut FfiResult> {
    if ptr.is_null() {
        return Err(FfiResult::null_arg(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiResult::from_error(ApiError::Validation(format!("{name} is not valid UTF-8"))))
}

fn guarded(name: &str, f: impl FnOnce() -> *mut FfiResult) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| FfiResult::panic(&format!("panic in {name}")))
}

/// `region` may be null for the default (US) endpoint. A non-null region
/// that is not UTF-8 yields `None` rather than falling back to US.
fn client_config(api_key: *const c_char, region: *const c_char, raise_errors: bool) -> Option<ClientConfig> {
    let mut config = ClientConfig::new(opt_str(api_key)?).ok()?;
    if !region.is_null() {
        config = config.with_region(opt_str(region)?);
    }
    if raise_errors {
        config = config.with_error_mode(ErrorMode::Raise);
    }
    Some(config)
}

/// A null body is read as empty; a body that is not UTF-8 is rejected.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> Result<HttpResponse, *mut FfiResult> {
    if resp.body.is_null() {
        return Ok(HttpResponse::new(resp.status, ""));
    }
    let body = unsafe { CStr::from_ptr(resp.body) }.to_str().map_err(|_| {
        FfiResult::from_error(ApiError::DeserializationError(
            "response body is not valid UTF-8".to_string(),
        ))
    })?;
    Ok(HttpResponse::new(resp.status, body))
}

fn set_parameter(
    options: &mut impl VerificationOptions,
    key: *const c_char,
    value_json: *const c_char,
) -> FfiErrorCode {
    let (Some(key), Some(value_json)) = (opt_str(key), opt_str(value_json)) else {
        return FfiErrorCode::NullArg;
    };
    match serde_json::from_str::<Value>(value_json) {
        Ok(value) => {
            options.set_parameter(key, value);
            FfiErrorCode::Ok
        }
        Err(_) => FfiErrorCode::Deserialization,
    }
}

fn session_kind(kind: u8) -> Option<SessionKind> {
    match kind {
        0 => Some(SessionKind::Iframe),
        1 => Some(SessionKind::Mobile),
        2 => Some(SessionKind::Redirection),
        3 => Some(SessionKind::LiveMobile),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a Core API client.
///
/// `region` is `"US"`, `"EU"`, a literal base URL, or null for US. With
/// `raise_errors` set, API-reported errors come back as `Remote` failures
/// instead of JSON bodies. Returns null if `api_key` is null or empty,
/// or if `region` is non-null but not UTF-8.
/// Free with `ida_core_free`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_core_new(
    api_key: *const c_char,
    region: *const c_char,
    raise_errors: bool,
) -> *mut FfiCoreClient {
    catch_unwind(|| match client_config(api_key, region, raise_errors) {
        Some(config) => Box::into_raw(Box::new(FfiCoreClient {
            inner: CoreApi::new(config),
        })),
        None => std::ptr::null_mut(),
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `ida_core_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ida_core_free(client: *mut FfiCoreClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

/// Create a DocuPass client for `company_name`.
///
/// Returns null if `api_key` or `company_name` is null or empty.
/// Free with `ida_docupass_free`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_new(
    api_key: *const c_char,
    company_name: *const c_char,
    region: *const c_char,
    raise_errors: bool,
) -> *mut FfiDocuPassClient {
    catch_unwind(|| {
        let Some(config) = client_config(api_key, region, raise_errors) else {
            return std::ptr::null_mut();
        };
        let Some(company) = opt_str(company_name) else {
            return std::ptr::null_mut();
        };
        match DocuPass::new(config, company) {
            Ok(inner) => Box::into_raw(Box::new(FfiDocuPassClient { inner })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_free(client: *mut FfiDocuPassClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

/// Create a Vault client. Returns null if `api_key` is null or empty.
#[unsafe(no_mangle)]
pub extern "C" fn ida_vault_new(
    api_key: *const c_char,
    region: *const c_char,
    raise_errors: bool,
) -> *mut FfiVaultClient {
    catch_unwind(|| match client_config(api_key, region, raise_errors) {
        Some(config) => Box::into_raw(Box::new(FfiVaultClient {
            inner: Vault::new(config),
        })),
        None => std::ptr::null_mut(),
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn ida_vault_free(client: *mut FfiVaultClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Set any scan parameter by name. `value_json` is a JSON value such as
/// `2`, `true` or `"\"US\""`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_core_set_parameter(
    client: *mut FfiCoreClient,
    key: *const c_char,
    value_json: *const c_char,
) -> FfiErrorCode {
    if client.is_null() {
        return FfiErrorCode::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &mut *client };
        set_parameter(&mut client.inner, key, value_json)
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

/// Restore every scan option to its default.
#[unsafe(no_mangle)]
pub extern "C" fn ida_core_reset_config(client: *mut FfiCoreClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| unsafe { &mut *client }.inner.reset_config()));
    }
}

/// Set any DocuPass parameter by name; see `ida_core_set_parameter`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_set_parameter(
    client: *mut FfiDocuPassClient,
    key: *const c_char,
    value_json: *const c_char,
) -> FfiErrorCode {
    if client.is_null() {
        return FfiErrorCode::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &mut *client };
        set_parameter(&mut client.inner, key, value_json)
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

/// Restore every DocuPass option to its default, keeping the company name.
#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_reset_config(client: *mut FfiDocuPassClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| unsafe { &mut *client }.inner.reset_config()));
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build a scan request.
///
/// `input_json` is an object with `document_primary` and optionally
/// `document_secondary`, `biometric_photo`, `biometric_video` and
/// `biometric_video_passcode`. Each image is a URL or a local file path.
/// On success `data_tag` is `Request`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_core_build_scan(
    client: *const FfiCoreClient,
    input_json: *const c_char,
) -> *mut FfiResult {
    guarded("ida_core_build_scan", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let raw = match arg(input_json, "input_json") {
            Ok(raw) => raw,
            Err(result) => return result,
        };
        let input: ScanInput = match serde_json::from_str(raw) {
            Ok(input) => input,
            Err(e) => return FfiResult::invalid_json("input_json", e),
        };
        match client.inner.build_scan(&input) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Build a session-creation request. `kind` is 0 iframe, 1 mobile,
/// 2 redirection or 3 live mobile.
#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_build_create(
    client: *const FfiDocuPassClient,
    kind: u8,
) -> *mut FfiResult {
    guarded("ida_docupass_build_create", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let Some(kind) = session_kind(kind) else {
            return FfiResult::from_error(ApiError::Validation(format!(
                "Invalid DocuPass session type {kind}."
            )));
        };
        match client.inner.build_create(kind) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Build a callback validation request for `reference` and `hash`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_build_validate(
    client: *const FfiDocuPassClient,
    reference: *const c_char,
    hash: *const c_char,
) -> *mut FfiResult {
    guarded("ida_docupass_build_validate", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let reference = match arg(reference, "reference") {
            Ok(reference) => reference,
            Err(result) => return result,
        };
        let hash = match arg(hash, "hash") {
            Ok(hash) => hash,
            Err(result) => return result,
        };
        match client.inner.build_validate(reference, hash) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Build a vault request from its JSON form, e.g.
/// `{"action":"get","id":"..."}` or `{"action":"list","limit":20}`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_vault_build(
    client: *const FfiVaultClient,
    request_json: *const c_char,
) -> *mut FfiResult {
    guarded("ida_vault_build", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let raw = match arg(request_json, "request_json") {
            Ok(raw) => raw,
            Err(result) => return result,
        };
        let request: VaultRequest = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(e) => return FfiResult::invalid_json("request_json", e),
        };
        match client.inner.build(&request) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Parse a scan response. On success `data_tag` is `Json`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_core_parse_scan(
    client: *const FfiCoreClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    guarded("ida_core_parse_scan", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(result) => return result,
        };
        match client.inner.parse_scan(resp) {
            Ok(body) => FfiResult::ok_json(&body),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_parse_create(
    client: *const FfiDocuPassClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    guarded("ida_docupass_parse_create", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(result) => return result,
        };
        match client.inner.parse_create(resp) {
            Ok(body) => FfiResult::ok_json(&body),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse a callback validation response. `data` is the JSON text `true`
/// or `false`.
#[unsafe(no_mangle)]
pub extern "C" fn ida_docupass_parse_validate(
    client: *const FfiDocuPassClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    guarded("ida_docupass_parse_validate", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(result) => return result,
        };
        match client.inner.parse_validate(resp) {
            Ok(valid) => FfiResult::ok_json(&Value::Bool(valid)),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ida_vault_parse(
    client: *const FfiVaultClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    guarded("ida_vault_parse", || {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = match ffi_response_to_core(unsafe { &*response }) {
            Ok(resp) => resp,
            Err(result) => return result,
        };
        match client.inner.parse(resp) {
            Ok(body) => FfiResult::ok_json(&body),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by any build or parse function, including
/// the request or JSON text it carries. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ida_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| unsafe { FfiResult::free(result) }));
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const KEY: &str = "test-key";

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn new_core(region: &str, raise: bool) -> *mut FfiCoreClient {
        let key = c(KEY);
        let region = c(region);
        ida_core_new(key.as_ptr(), region.as_ptr(), raise)
    }

    fn request<'a>(result: *mut FfiResult) -> &'a FfiHttpRequest {
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::Request);
        unsafe { &*(r.data as *const FfiHttpRequest) }
    }

    fn text<'a>(ptr: *const c_char) -> &'a str {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
    }

    fn body_json(req: &FfiHttpRequest) -> Value {
        serde_json::from_str(text(req.body)).unwrap()
    }

    fn json_data(result: *mut FfiResult) -> Value {
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::Json);
        serde_json::from_str(text(r.data as *const c_char)).unwrap()
    }

    #[test]
    fn client_new_and_free() {
        let client = new_core("US", false);
        assert!(!client.is_null());
        ida_core_free(client);
    }

    #[test]
    fn client_new_rejects_missing_or_empty_key() {
        assert!(ida_core_new(std::ptr::null(), std::ptr::null(), false).is_null());
        let empty = c("");
        assert!(ida_vault_new(empty.as_ptr(), std::ptr::null(), false).is_null());
    }

    #[test]
    fn client_new_rejects_region_that_is_not_utf8() {
        let key = c(KEY);
        let region = CString::new(vec![b'E', 0xff, b'U']).unwrap();
        assert!(ida_core_new(key.as_ptr(), region.as_ptr(), false).is_null());
        assert!(ida_vault_new(key.as_ptr(), region.as_ptr(), false).is_null());
        let company = c("Acme");
        assert!(ida_docupass_new(key.as_ptr(), company.as_ptr(), region.as_ptr(), false).is_null());
    }

    #[test]
    fn parse_rejects_body_that_is_not_utf8() {
        let client = new_core("US", false);
        let body = CString::new(vec![b'{', 0xff, b'}']).unwrap();
        let response = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = ida_core_parse_scan(client, &response);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Deserialization);
        assert!(r.data.is_null());
        assert!(text(r.error_message).contains("not valid UTF-8"), "{}", text(r.error_message));
        ida_free_result(result);
        ida_core_free(client);
    }

    #[test]
    fn docupass_new_requires_company_name() {
        let key = c(KEY);
        let empty = c("");
        assert!(ida_docupass_new(key.as_ptr(), empty.as_ptr(), std::ptr::null(), false).is_null());
        assert!(ida_docupass_new(key.as_ptr(), std::ptr::null(), std::ptr::null(), false).is_null());
        let company = c("Acme");
        let client = ida_docupass_new(key.as_ptr(), company.as_ptr(), std::ptr::null(), false);
        assert!(!client.is_null());
        ida_docupass_free(client);
    }

    #[test]
    fn free_null_is_safe() {
        ida_core_free(std::ptr::null_mut());
        ida_docupass_free(std::ptr::null_mut());
        ida_vault_free(std::ptr::null_mut());
        ida_free_result(std::ptr::null_mut());
    }

    #[test]
    fn build_scan_uses_region_and_parameters() {
        let client = new_core("EU", false);
        let key = c("accuracy");
        let value = c("0");
        assert_eq!(ida_core_set_parameter(client, key.as_ptr(), value.as_ptr()), FfiErrorCode::Ok);

        let input = c(r#"{"document_primary":"https://example.com/id.jpg"}"#);
        let result = ida_core_build_scan(client, input.as_ptr());
        let req = request(result);
        assert_eq!(text(req.url), "https://api-eu.idanalyzer.com/");
        assert_eq!(req.headers_len, 1);
        let header = unsafe { &*req.headers };
        assert_eq!(text(header.key), "content-type");

        let body = body_json(req);
        assert_eq!(body["accuracy"], 0);
        assert_eq!(body["url"], "https://example.com/id.jpg");
        assert_eq!(body["apikey"], KEY);

        ida_free_result(result);
        ida_core_reset_config(client);
        let result = ida_core_build_scan(client, input.as_ptr());
        assert_eq!(body_json(request(result))["accuracy"], 2);
        ida_free_result(result);
        ida_core_free(client);
    }

    #[test]
    fn set_parameter_rejects_bad_json() {
        let client = new_core("US", false);
        let key = c("accuracy");
        let value = c("not json");
        assert_eq!(
            ida_core_set_parameter(client, key.as_ptr(), value.as_ptr()),
            FfiErrorCode::Deserialization
        );
        assert_eq!(
            ida_core_set_parameter(client, std::ptr::null(), value.as_ptr()),
            FfiErrorCode::NullArg
        );
        ida_core_free(client);
    }

    #[test]
    fn build_scan_validation_error() {
        let client = new_core("US", false);
        let input = c(r#"{"document_primary":"no/such/file.jpg"}"#);
        let result = ida_core_build_scan(client, input.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Validation);
        assert!(r.data.is_null());
        assert!(text(r.error_message).contains("file not found"));
        ida_free_result(result);

        let bad = c("{");
        let result = ida_core_build_scan(client, bad.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Deserialization);
        ida_free_result(result);
        ida_core_free(client);
    }

    #[test]
    fn build_null_arguments() {
        let result = ida_core_build_scan(std::ptr::null(), std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        ida_free_result(result);

        let client = new_core("US", false);
        let result = ida_core_build_scan(client, std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        assert!(text(r.error_message).contains("input_json"));
        ida_free_result(result);
        ida_core_free(client);
    }

    #[test]
    fn docupass_build_create_and_validate() {
        let key = c(KEY);
        let company = c("Acme");
        let client = ida_docupass_new(key.as_ptr(), company.as_ptr(), std::ptr::null(), false);

        let result = ida_docupass_build_create(client, 3);
        let req = request(result);
        assert_eq!(text(req.url), "https://api.idanalyzer.com/docupass/create");
        let body = body_json(req);
        assert_eq!(body["type"], 3);
        assert_eq!(body["companyname"], "Acme");
        ida_free_result(result);

        let result = ida_docupass_build_create(client, 9);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Validation);
        ida_free_result(result);

        let reference = c("ABCD1234");
        let hash = c("h");
        let result = ida_docupass_build_validate(client, reference.as_ptr(), hash.as_ptr());
        let body = body_json(request(result));
        assert_eq!(body.as_object().unwrap().len(), 3);
        assert_eq!(body["reference"], "ABCD1234");
        ida_free_result(result);

        ida_docupass_free(client);
    }

    #[test]
    fn docupass_parse_validate_is_json_bool() {
        let key = c(KEY);
        let company = c("Acme");
        let client = ida_docupass_new(key.as_ptr(), company.as_ptr(), std::ptr::null(), true);
        let body = c(r#"{"error":{"code":15,"message":"bad hash"}}"#);
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = ida_docupass_parse_validate(client, &resp);
        assert_eq!(json_data(result), Value::Bool(false));
        ida_free_result(result);
        ida_docupass_free(client);
    }

    #[test]
    fn vault_build_from_json() {
        let key = c(KEY);
        let client = ida_vault_new(key.as_ptr(), std::ptr::null(), false);
        let req_json = c(r#"{"action":"delete","ids":["a","b"]}"#);
        let result = ida_vault_build(client, req_json.as_ptr());
        let req = request(result);
        assert_eq!(text(req.url), "https://api.idanalyzer.com/vault/delete");
        assert_eq!(body_json(req)["id"], serde_json::json!(["a", "b"]));
        ida_free_result(result);

        let unknown = c(r#"{"action":"explode"}"#);
        let result = ida_vault_build(client, unknown.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Deserialization);
        ida_free_result(result);
        ida_vault_free(client);
    }

    #[test]
    fn parse_remote_error_depends_on_mode() {
        let body = c(r#"{"error":{"code":14,"message":"mismatch"}}"#);
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };

        let lenient = new_core("US", false);
        let result = ida_core_parse_scan(lenient, &resp);
        assert_eq!(json_data(result)["error"]["code"], 14);
        ida_free_result(result);
        ida_core_free(lenient);

        let strict = new_core("US", true);
        let result = ida_core_parse_scan(strict, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Remote);
        assert_eq!(r.remote_code, 14);
        assert!(r.data.is_null());
        ida_free_result(result);
        ida_core_free(strict);
    }

    #[test]
    fn parse_http_error_carries_status() {
        let client = new_core("US", false);
        let body = c("gateway timeout");
        let resp = FfiHttpResponse {
            status: 504,
            body: body.as_ptr(),
        };
        let result = ida_core_parse_scan(client, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Http);
        assert_eq!(r.http_status, 504);
        ida_free_result(result);

        let result = ida_core_parse_scan(client, std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        ida_free_result(result);
        ida_core_free(client);
    }

    /// Execute an `FfiHttpRequest` with ureq the way a C host would.
    fn execute(req: &FfiHttpRequest) -> (u16, CString) {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        let headers = unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) };
        let mut builder = agent.post(text(req.url));
        for h in headers {
            builder = builder.header(text(h.key), text(h.value));
        }
        let mut response = builder.send(text(req.body).as_bytes()).unwrap();
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap();
        (status, CString::new(body).unwrap())
    }

    #[test]
    fn round_trip_against_mock_server() {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener, KEY).await
            })
            .unwrap();
        });

        let client = new_core(&format!("http://{addr}"), false);
        let input = c(r#"{"document_primary":"https://example.com/id.jpg"}"#);
        let built = ida_core_build_scan(client, input.as_ptr());
        let (status, body) = execute(request(built));
        ida_free_result(built);

        let resp = FfiHttpResponse {
            status,
            body: body.as_ptr(),
        };
        let parsed = ida_core_parse_scan(client, &resp);
        let scan = json_data(parsed);
        assert_eq!(scan["result"]["documentNumber"], "X1234567");
        let vault_id = scan["vaultid"].as_str().unwrap().to_string();
        ida_free_result(parsed);
        ida_core_free(client);

        let key = c(KEY);
        let region = c(&format!("http://{addr}"));
        let vault = ida_vault_new(key.as_ptr(), region.as_ptr(), true);
        let get = c(&format!(r#"{{"action":"get","id":"{vault_id}"}}"#));
        let built = ida_vault_build(vault, get.as_ptr());
        let (status, body) = execute(request(built));
        ida_free_result(built);
        let resp = FfiHttpResponse {
            status,
            body: body.as_ptr(),
        };
        let parsed = ida_vault_parse(vault, &resp);
        assert_eq!(json_data(parsed)["data"]["id"], vault_id.as_str());
        ida_free_result(parsed);
        ida_vault_free(vault);
    }
}
