//! DocuPass: hosted identity verification sessions.
//!
//! Instead of uploading documents directly, the integrator creates a session
//! and sends the end user to it (iframe, mobile/QR, redirect or live mobile).
//! Results arrive at the callback URL; `validate` confirms a callback really
//! came from the service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::{parse_object, ApiClient, JsonObject};
use crate::config::{ClientConfig, SDK_CLIENT_ID};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::options::{empty_if_none, merge_payload, AuthModule, IdentityChecks, VerificationOptions};
use crate::validate::{is_hex_color, require_non_empty, require_url};

pub const CREATE_ACTION: &str = "docupass/create";
pub const VALIDATE_ACTION: &str = "docupass/validate";

/// The kind of session to create, sent as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Embedded in a web page as an iframe.
    Iframe = 0,
    /// Opened on a phone, typically through a QR code.
    Mobile = 1,
    /// Opened in any browser, redirecting back when done.
    Redirection = 2,
    /// Live verification on a phone.
    LiveMobile = 3,
}

/// Facial biometric step required from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceVerification {
    Photo = 1,
    Video = 2,
}

impl TryFrom<u8> for FaceVerification {
    type Error = ApiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FaceVerification::Photo),
            2 => Ok(FaceVerification::Video),
            _ => Err(ApiError::validation(
                "Invalid verification type, 1 for photo verification, 2 for video verification.",
            )),
        }
    }
}

/// Known DocuPass options, serialized under their wire names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOptions {
    pub companyname: String,
    pub callbackurl: String,
    pub biometric: u8,
    pub authenticate_minscore: f64,
    pub authenticate_module: AuthModule,
    pub maxattempt: u8,
    pub documenttype: String,
    pub documentcountry: String,
    pub documentregion: String,
    pub dualsidecheck: bool,
    #[serde(flatten)]
    pub checks: IdentityChecks,
    pub successredir: String,
    pub failredir: String,
    pub customid: String,
    pub vault_save: bool,
    pub return_documentimage: bool,
    pub return_faceimage: bool,
    pub return_type: u8,
    pub qr_color: String,
    pub qr_bgcolor: String,
    #[serde(serialize_with = "empty_if_none")]
    pub qr_size: Option<u32>,
    #[serde(serialize_with = "empty_if_none")]
    pub qr_margin: Option<u32>,
    pub welcomemessage: String,
    #[serde(serialize_with = "empty_if_none")]
    pub nobranding: Option<bool>,
    pub logo: String,
    pub language: String,
    pub biometric_threshold: f64,
    pub reusable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customhtmlurl: Option<String>,
    pub client: String,
}

impl SessionOptions {
    fn new(company_name: &str) -> Self {
        Self {
            companyname: company_name.to_string(),
            callbackurl: String::new(),
            biometric: 0,
            authenticate_minscore: 0.0,
            authenticate_module: AuthModule::V2,
            maxattempt: 1,
            documenttype: String::new(),
            documentcountry: String::new(),
            documentregion: String::new(),
            dualsidecheck: false,
            checks: IdentityChecks::new(false),
            successredir: String::new(),
            failredir: String::new(),
            customid: String::new(),
            vault_save: true,
            return_documentimage: true,
            return_faceimage: true,
            return_type: 1,
            qr_color: String::new(),
            qr_bgcolor: String::new(),
            qr_size: None,
            qr_margin: None,
            welcomemessage: String::new(),
            nobranding: None,
            logo: String::new(),
            language: String::new(),
            biometric_threshold: 0.4,
            reusable: false,
            customhtmlurl: None,
            client: SDK_CLIENT_ID.to_string(),
        }
    }
}

/// Client for DocuPass sessions.
#[derive(Clone)]
pub struct DocuPass {
    client: ApiClient,
    company_name: String,
    options: SessionOptions,
    extra: JsonObject,
}

impl DocuPass {
    pub fn new(config: ClientConfig, company_name: &str) -> Result<Self, ApiError> {
        Self::from_client(ApiClient::new(config), company_name)
    }

    pub fn with_transport(
        config: ClientConfig,
        company_name: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        Self::from_client(ApiClient::with_transport(config, transport), company_name)
    }

    fn from_client(client: ApiClient, company_name: &str) -> Result<Self, ApiError> {
        require_non_empty(company_name, "Please provide your company name")?;
        Ok(Self {
            client,
            company_name: company_name.to_string(),
            options: SessionOptions::new(company_name),
            extra: JsonObject::new(),
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Restore every option to its default. Credentials, region and company
    /// name are kept.
    pub fn reset_config(&mut self) {
        self.options = SessionOptions::new(&self.company_name);
        self.extra.clear();
    }

    /// Verification attempts allowed per user, 1 to 10.
    pub fn set_max_attempt(&mut self, max_attempt: u8) -> Result<(), ApiError> {
        if !(1..=10).contains(&max_attempt) {
            return Err(ApiError::validation(
                "Invalid max attempt, please specify integer between 1 to 10.",
            ));
        }
        self.options.maxattempt = max_attempt;
        Ok(())
    }

    /// Opaque identifier echoed to the callback and redirection URLs.
    pub fn set_custom_id(&mut self, custom_id: &str) {
        self.options.customid = custom_id.to_string();
    }

    pub fn set_welcome_message(&mut self, message: &str) {
        self.options.welcomemessage = message.to_string();
    }

    /// Replace the footer logo.
    pub fn set_logo(&mut self, url: &str) {
        self.options.logo = url.to_string();
    }

    pub fn hide_branding_logo(&mut self, hide: bool) {
        self.options.nobranding = Some(hide);
    }

    /// Override the language detected from the user's device.
    pub fn set_language(&mut self, language: &str) {
        self.options.language = language.to_string();
    }

    /// Replace the page content with the HTML served at `url`.
    pub fn set_custom_html(&mut self, url: &str) {
        self.options.customhtmlurl = Some(url.to_string());
    }

    /// Server-side webhook that receives verification results.
    pub fn set_callback_url(&mut self, url: &str) -> Result<(), ApiError> {
        require_url(url, "callback URL")?;
        self.options.callbackurl = url.to_string();
        Ok(())
    }

    /// Where the browser goes after success or failure.
    pub fn set_redirection_url(&mut self, success_url: &str, fail_url: &str) -> Result<(), ApiError> {
        require_url(success_url, "success URL")?;
        require_url(fail_url, "fail URL")?;
        self.options.successredir = success_url.to_string();
        self.options.failredir = fail_url.to_string();
        Ok(())
    }

    /// Require an authenticity score of at least `minimum_score`.
    ///
    /// Disabling only resets the minimum score; the module is left as is.
    pub fn enable_authentication(
        &mut self,
        enabled: bool,
        module: &str,
        minimum_score: f64,
    ) -> Result<(), ApiError> {
        if !enabled {
            self.options.authenticate_minscore = 0.0;
            return Ok(());
        }
        if !(0.0..=1.0).contains(&minimum_score) {
            return Err(ApiError::validation(
                "Invalid minimum score, please specify float between 0 to 1.",
            ));
        }
        self.options.authenticate_module = module.parse()?;
        self.options.authenticate_minscore = minimum_score;
        Ok(())
    }

    /// Require a selfie photo (`1`) or video (`2`) matched at `threshold`.
    pub fn enable_face_verification(
        &mut self,
        enabled: bool,
        verification_type: u8,
        threshold: f64,
    ) -> Result<(), ApiError> {
        if !enabled {
            self.options.biometric = 0;
            return Ok(());
        }
        let kind = FaceVerification::try_from(verification_type)?;
        self.options.biometric = kind as u8;
        self.options.biometric_threshold = threshold;
        Ok(())
    }

    /// Allow any number of users to verify through the same session URL.
    pub fn set_reusable(&mut self, reusable: bool) {
        self.options.reusable = reusable;
    }

    /// Which images the callback carries; `return_type` 0 is base64, any
    /// other value means URLs.
    pub fn set_callback_image(&mut self, return_documentimage: bool, return_faceimage: bool, return_type: u8) {
        self.options.return_documentimage = return_documentimage;
        self.options.return_faceimage = return_faceimage;
        self.options.return_type = if return_type == 0 { 0 } else { 1 };
    }

    /// Colors are six hex digits without `#`.
    pub fn set_qr_code_format(
        &mut self,
        foreground_color: &str,
        background_color: &str,
        size: u32,
        margin: u32,
    ) -> Result<(), ApiError> {
        if !is_hex_color(foreground_color) {
            return Err(ApiError::validation("Invalid foreground color HEX code"));
        }
        if !is_hex_color(background_color) {
            return Err(ApiError::validation("Invalid background color HEX code"));
        }
        self.options.qr_color = foreground_color.to_string();
        self.options.qr_bgcolor = background_color.to_string();
        self.options.qr_size = Some(size);
        self.options.qr_margin = Some(margin);
        Ok(())
    }

    pub fn enable_dualside_check(&mut self, enabled: bool) {
        self.options.dualsidecheck = enabled;
    }

    pub fn restrict_country(&mut self, country_codes: &str) {
        self.options.documentcountry = country_codes.to_string();
    }

    pub fn restrict_state(&mut self, states: &str) {
        self.options.documentregion = states.to_string();
    }

    pub fn restrict_type(&mut self, document_type: &str) {
        self.options.documenttype = document_type.to_string();
    }

    pub fn enable_vault(&mut self, enabled: bool) {
        self.options.vault_save = enabled;
    }

    pub fn build_create(&self, kind: SessionKind) -> Result<HttpRequest, ApiError> {
        let mut payload = merge_payload(&self.options, &self.extra)?;
        payload.insert("type".to_string(), json!(kind as u8));
        self.client.build(CREATE_ACTION, payload)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Value, ApiError> {
        self.client.parse(response)
    }

    #[instrument(skip(self))]
    pub fn create(&self, kind: SessionKind) -> Result<Value, ApiError> {
        let request = self.build_create(kind)?;
        let response = self.client.send(&request)?;
        self.parse_create(response)
    }

    pub fn create_iframe(&self) -> Result<Value, ApiError> {
        self.create(SessionKind::Iframe)
    }

    pub fn create_mobile(&self) -> Result<Value, ApiError> {
        self.create(SessionKind::Mobile)
    }

    pub fn create_redirection(&self) -> Result<Value, ApiError> {
        self.create(SessionKind::Redirection)
    }

    pub fn create_live_mobile(&self) -> Result<Value, ApiError> {
        self.create(SessionKind::LiveMobile)
    }

    /// The validation payload carries only the key, reference and hash.
    pub fn build_validate(&self, reference: &str, hash: &str) -> Result<HttpRequest, ApiError> {
        let mut payload = JsonObject::new();
        payload.insert("reference".to_string(), json!(reference));
        payload.insert("hash".to_string(), json!(hash));
        self.client.build(VALIDATE_ACTION, payload)
    }

    /// `true` when the response carries a `success` key. Remote error
    /// objects simply mean `false`, whatever the error mode.
    pub fn parse_validate(&self, response: HttpResponse) -> Result<bool, ApiError> {
        let body = parse_object(response)?;
        let valid = body.get("success").is_some();
        debug!(valid, "callback validation");
        Ok(valid)
    }

    /// Check callback data against the server to detect spoofing.
    #[instrument(skip_all)]
    pub fn validate(&self, reference: &str, hash: &str) -> Result<bool, ApiError> {
        let request = self.build_validate(reference, hash)?;
        let response = self.client.send(&request)?;
        self.parse_validate(response)
    }
}

impl VerificationOptions for DocuPass {
    fn checks_mut(&mut self) -> &mut IdentityChecks {
        &mut self.options.checks
    }

    fn extra_mut(&mut self) -> &mut JsonObject {
        &mut self.extra
    }
}
