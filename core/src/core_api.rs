//! Core API: scan a document, optionally with its back side and a face
//! photo or video, and verify it against the configured checks.

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, JsonObject};
use crate::config::{ClientConfig, SDK_CLIENT_ID};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::input::{DOCUMENT_PRIMARY, DOCUMENT_SECONDARY, FACE_PHOTO, FACE_VIDEO};
use crate::options::{merge_payload, AuthModule, IdentityChecks, VerificationOptions};
use crate::validate::is_video_passcode;

/// Scans are posted to the bare endpoint.
pub const SCAN_ACTION: &str = "";

/// OCR speed/accuracy trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    Fast = 0,
    Balanced = 1,
    #[default]
    Accurate = 2,
}

impl Serialize for Accuracy {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(*self as u8)
    }
}

/// How cropped images are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Url,
    Base64,
}

/// Known Core API options, serialized under their wire names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOptions {
    pub accuracy: Accuracy,
    pub authenticate: bool,
    pub authenticate_module: AuthModule,
    pub ocr_scaledown: u32,
    pub outputimage: bool,
    pub outputface: bool,
    pub outputmode: OutputFormat,
    pub dualsidecheck: bool,
    #[serde(flatten)]
    pub checks: IdentityChecks,
    pub country: String,
    pub region: String,
    #[serde(rename = "type")]
    pub document_type: String,
    pub checkblocklist: bool,
    pub vault_save: bool,
    pub vault_saveunrecognized: bool,
    pub vault_noduplicate: bool,
    pub vault_automerge: bool,
    pub vault_customdata1: String,
    pub vault_customdata2: String,
    pub vault_customdata3: String,
    pub vault_customdata4: String,
    pub vault_customdata5: String,
    pub barcodemode: bool,
    pub biometric_threshold: f64,
    pub client: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::Accurate,
            authenticate: false,
            authenticate_module: AuthModule::V1,
            ocr_scaledown: 2000,
            outputimage: false,
            outputface: false,
            outputmode: OutputFormat::Url,
            dualsidecheck: false,
            checks: IdentityChecks::new(true),
            country: String::new(),
            region: String::new(),
            document_type: String::new(),
            checkblocklist: false,
            vault_save: true,
            vault_saveunrecognized: false,
            vault_noduplicate: false,
            vault_automerge: false,
            vault_customdata1: String::new(),
            vault_customdata2: String::new(),
            vault_customdata3: String::new(),
            vault_customdata4: String::new(),
            vault_customdata5: String::new(),
            barcodemode: false,
            biometric_threshold: 0.4,
            client: SDK_CLIENT_ID.to_string(),
        }
    }
}

/// Images and video submitted with one scan.
///
/// Every entry is a URL or a local file path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInput {
    pub document_primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometric_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometric_video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometric_video_passcode: Option<String>,
}

impl ScanInput {
    pub fn new(document_primary: impl Into<String>) -> Self {
        Self {
            document_primary: document_primary.into(),
            ..Self::default()
        }
    }

    /// Back side of the document.
    pub fn document_secondary(mut self, input: impl Into<String>) -> Self {
        self.document_secondary = Some(input.into());
        self
    }

    /// Photo of the holder's face for biometric matching.
    pub fn face_photo(mut self, input: impl Into<String>) -> Self {
        self.biometric_photo = Some(input.into());
        self
    }

    /// Selfie video in which the holder reads out a 4-digit `passcode`.
    pub fn face_video(mut self, input: impl Into<String>, passcode: impl Into<String>) -> Self {
        self.biometric_video = Some(input.into());
        self.biometric_video_passcode = Some(passcode.into());
        self
    }
}

fn non_empty(opt: &Option<String>) -> Option<&str> {
    opt.as_deref().filter(|s| !s.is_empty())
}

/// Client for the Core API.
#[derive(Clone)]
pub struct CoreApi {
    client: ApiClient,
    options: ScanOptions,
    extra: JsonObject,
}

impl CoreApi {
    pub fn new(config: ClientConfig) -> Self {
        Self::from_client(ApiClient::new(config))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::from_client(ApiClient::with_transport(config, transport))
    }

    fn from_client(client: ApiClient) -> Self {
        Self {
            client,
            options: ScanOptions::default(),
            extra: JsonObject::new(),
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Restore every option to its default. Credentials and region are kept.
    pub fn reset_config(&mut self) {
        self.options = ScanOptions::default();
        self.extra.clear();
    }

    pub fn set_accuracy(&mut self, accuracy: Accuracy) {
        self.options.accuracy = accuracy;
    }

    /// Score the document for signs of tampering with the given module.
    pub fn enable_authentication(&mut self, enabled: bool, module: &str) -> Result<(), ApiError> {
        let module = if enabled {
            module.parse()?
        } else {
            module.parse().unwrap_or(self.options.authenticate_module)
        };
        self.options.authenticate = enabled;
        self.options.authenticate_module = module;
        Ok(())
    }

    /// Downscale images wider than `max_scale` before OCR; 0 disables.
    pub fn set_ocr_image_resize(&mut self, max_scale: u32) -> Result<(), ApiError> {
        if max_scale != 0 && !(500..=4000).contains(&max_scale) {
            return Err(ApiError::validation(
                "Invalid scale value, 0, or 500 to 4000 accepted.",
            ));
        }
        self.options.ocr_scaledown = max_scale;
        Ok(())
    }

    /// Minimum face-match confidence, in `(0, 1]`.
    pub fn set_biometric_threshold(&mut self, threshold: f64) -> Result<(), ApiError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ApiError::validation(
                "Invalid threshold value, float between 0 to 1 accepted.",
            ));
        }
        self.options.biometric_threshold = threshold;
        Ok(())
    }

    pub fn enable_image_output(&mut self, crop_document: bool, crop_face: bool, format: OutputFormat) {
        self.options.outputimage = crop_document;
        self.options.outputface = crop_face;
        self.options.outputmode = format;
    }

    /// Have the server compare front and back; a mismatch is error 14.
    pub fn enable_dualside_check(&mut self, enabled: bool) {
        self.options.dualsidecheck = enabled;
    }

    /// ISO alpha-2 codes separated by commas; other issuers fail with error 10.
    pub fn restrict_country(&mut self, country_codes: &str) {
        self.options.country = country_codes.to_string();
    }

    /// State names or abbreviations separated by commas; error 11 otherwise.
    pub fn restrict_state(&mut self, states: &str) {
        self.options.region = states.to_string();
    }

    /// Any of `P` (passport), `D` (driver's license), `I` (ID card); error 12 otherwise.
    pub fn restrict_type(&mut self, document_type: &str) {
        self.options.document_type = document_type.to_string();
    }

    /// Read AAMVA barcodes only, skipping visual OCR.
    pub fn enable_barcode_mode(&mut self, enabled: bool) {
        self.options.barcodemode = enabled;
    }

    pub fn enable_blocklist_check(&mut self, enabled: bool) {
        self.options.checkblocklist = enabled;
    }

    pub fn enable_vault(
        &mut self,
        enabled: bool,
        save_unrecognized: bool,
        no_duplicate_image: bool,
        auto_merge_document: bool,
    ) {
        self.options.vault_save = enabled;
        self.options.vault_saveunrecognized = save_unrecognized;
        self.options.vault_noduplicate = no_duplicate_image;
        self.options.vault_automerge = auto_merge_document;
    }

    /// Up to five custom strings stored with the vault entry. Missing
    /// trailing values are cleared.
    pub fn set_vault_data(&mut self, data: &[&str]) -> Result<(), ApiError> {
        if data.len() > 5 {
            return Err(ApiError::validation("At most 5 custom vault data fields accepted."));
        }
        let get = |i: usize| data.get(i).map(|s| s.to_string()).unwrap_or_default();
        self.options.vault_customdata1 = get(0);
        self.options.vault_customdata2 = get(1);
        self.options.vault_customdata3 = get(2);
        self.options.vault_customdata4 = get(3);
        self.options.vault_customdata5 = get(4);
        Ok(())
    }

    /// Validate and resolve `input` into a scan request.
    pub fn build_scan(&self, input: &ScanInput) -> Result<HttpRequest, ApiError> {
        if input.document_primary.is_empty() {
            return Err(ApiError::validation("Primary document image required."));
        }
        let mut payload = merge_payload(&self.options, &self.extra)?;
        DOCUMENT_PRIMARY.insert(&mut payload, &input.document_primary)?;
        if let Some(back) = non_empty(&input.document_secondary) {
            DOCUMENT_SECONDARY.insert(&mut payload, back)?;
        }
        if let Some(photo) = non_empty(&input.biometric_photo) {
            FACE_PHOTO.insert(&mut payload, photo)?;
        }
        if let Some(video) = non_empty(&input.biometric_video) {
            FACE_VIDEO.insert(&mut payload, video)?;
            let passcode = input.biometric_video_passcode.as_deref().unwrap_or_default();
            if !is_video_passcode(passcode) {
                return Err(ApiError::validation(
                    "Please provide a 4 digit passcode for video biometric verification.",
                ));
            }
            payload.insert("passcode".to_string(), Value::String(passcode.to_string()));
        }
        self.client.build(SCAN_ACTION, payload)
    }

    pub fn parse_scan(&self, response: HttpResponse) -> Result<Value, ApiError> {
        self.client.parse(response)
    }

    /// Scan a document and return the API response.
    #[instrument(skip_all)]
    pub fn scan(&self, input: &ScanInput) -> Result<Value, ApiError> {
        let request = self.build_scan(input)?;
        let response = self.client.send(&request)?;
        self.parse_scan(response)
    }
}

impl VerificationOptions for CoreApi {
    fn checks_mut(&mut self) -> &mut IdentityChecks {
        &mut self.options.checks
    }

    fn extra_mut(&mut self) -> &mut JsonObject {
        &mut self.extra
    }
}
