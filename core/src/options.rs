//! Option types shared by the Core API and DocuPass clients.
//!
//! # Design
//! Each client keeps its known options in a typed struct serialized with the
//! wire field names, plus an `extra` map filled by `set_parameter`. When a
//! payload is assembled the known fields are written first and the extra
//! entries last, so a parameter set by name overrides a typed field with the
//! same key.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::client::JsonObject;
use crate::error::ApiError;
use crate::validate::{optional_age_range, optional_date};

/// Flatten typed options and `extra` into one payload object.
pub(crate) fn merge_payload<T: Serialize>(known: &T, extra: &JsonObject) -> Result<JsonObject, ApiError> {
    let value = serde_json::to_value(known).map_err(|e| ApiError::SerializationError(e.to_string()))?;
    let mut payload = match value {
        Value::Object(map) => map,
        _ => return Err(ApiError::SerializationError("options must serialize to an object".to_string())),
    };
    for (key, value) in extra {
        payload.insert(key.clone(), value.clone());
    }
    Ok(payload)
}

/// Serialize `None` as the empty string the API uses for "unset".
pub(crate) fn empty_if_none<T: Serialize, S: Serializer>(value: &Option<T>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => v.serialize(s),
        None => s.serialize_str(""),
    }
}

/// Document authentication algorithm version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthModule {
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "2")]
    V2,
    #[serde(rename = "quick")]
    Quick,
}

impl FromStr for AuthModule {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(AuthModule::V1),
            "2" => Ok(AuthModule::V2),
            "quick" => Ok(AuthModule::Quick),
            _ => Err(ApiError::validation(
                "Invalid authentication module, 1, 2 or 'quick' accepted.",
            )),
        }
    }
}

impl fmt::Display for AuthModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthModule::V1 => write!(f, "1"),
            AuthModule::V2 => write!(f, "2"),
            AuthModule::Quick => write!(f, "quick"),
        }
    }
}

/// Fields the server compares against what it reads from the document.
///
/// Empty strings mean "do not check".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityChecks {
    pub verify_expiry: bool,
    pub verify_documentno: String,
    pub verify_name: String,
    pub verify_dob: String,
    pub verify_age: String,
    pub verify_address: String,
    pub verify_postcode: String,
}

impl IdentityChecks {
    pub(crate) fn new(verify_expiry: bool) -> Self {
        Self {
            verify_expiry,
            verify_documentno: String::new(),
            verify_name: String::new(),
            verify_dob: String::new(),
            verify_age: String::new(),
            verify_address: String::new(),
            verify_postcode: String::new(),
        }
    }

    /// `YYYY/MM/DD`, or empty to clear.
    pub(crate) fn set_dob(&mut self, dob: &str) -> Result<(), ApiError> {
        self.verify_dob = optional_date(dob)?;
        Ok(())
    }

    /// `<min>-<max>`, or empty to clear.
    pub(crate) fn set_age(&mut self, range: &str) -> Result<(), ApiError> {
        self.verify_age = optional_age_range(range)?;
        Ok(())
    }
}

/// Methods common to clients that carry an option set.
///
/// Implemented by `CoreApi` and `DocuPass`; the provided methods cover the
/// identity checks both services accept under the same names.
pub trait VerificationOptions {
    fn checks_mut(&mut self) -> &mut IdentityChecks;

    fn extra_mut(&mut self) -> &mut JsonObject;

    /// Set any API parameter by name, bypassing the typed setters.
    fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra_mut().insert(key.into(), value.into());
    }

    /// Reject documents past their expiry date.
    fn verify_expiry(&mut self, enabled: bool) {
        self.checks_mut().verify_expiry = enabled;
    }

    fn verify_document_number(&mut self, document_number: &str) {
        self.checks_mut().verify_documentno = document_number.to_string();
    }

    fn verify_name(&mut self, full_name: &str) {
        self.checks_mut().verify_name = full_name.to_string();
    }

    /// Date of birth as `YYYY/MM/DD`; empty disables the check.
    fn verify_dob(&mut self, dob: &str) -> Result<(), ApiError> {
        self.checks_mut().set_dob(dob)
    }

    /// Age range such as `18-40`; empty disables the check.
    fn verify_age(&mut self, age_range: &str) -> Result<(), ApiError> {
        self.checks_mut().set_age(age_range)
    }

    fn verify_address(&mut self, address: &str) {
        self.checks_mut().verify_address = address.to_string();
    }

    fn verify_postcode(&mut self, postcode: &str) {
        self.checks_mut().verify_postcode = postcode.to_string();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct Sample {
        accuracy: u8,
        #[serde(serialize_with = "empty_if_none")]
        qr_size: Option<u32>,
    }

    #[test]
    fn extra_entries_override_known_fields() {
        let mut extra = JsonObject::new();
        extra.insert("accuracy".to_string(), json!(0));
        extra.insert("custom".to_string(), json!("x"));
        let payload = merge_payload(&Sample { accuracy: 2, qr_size: None }, &extra).unwrap();
        assert_eq!(payload["accuracy"], 0);
        assert_eq!(payload["custom"], "x");
        assert_eq!(payload["qr_size"], "");
    }

    #[test]
    fn some_value_serializes_normally() {
        let payload = merge_payload(&Sample { accuracy: 1, qr_size: Some(5) }, &JsonObject::new()).unwrap();
        assert_eq!(payload["qr_size"], 5);
    }

    #[test]
    fn auth_module_round_trips_through_str() {
        for s in ["1", "2", "quick"] {
            assert_eq!(s.parse::<AuthModule>().unwrap().to_string(), s);
        }
        assert!(matches!("3".parse::<AuthModule>(), Err(ApiError::Validation(_))));
        assert_eq!(serde_json::to_value(AuthModule::Quick).unwrap(), json!("quick"));
    }

    #[test]
    fn identity_checks_validate_formats() {
        let mut checks = IdentityChecks::new(true);
        checks.set_dob("1990/01/01").unwrap();
        checks.set_age("18-99").unwrap();
        assert!(checks.set_dob("01/01/1990").is_err());
        assert!(checks.set_age("18+").is_err());
        // failed setters leave the previous value in place
        assert_eq!(checks.verify_dob, "1990/01/01");
        assert_eq!(checks.verify_age, "18-99");
        checks.set_dob("").unwrap();
        assert_eq!(checks.verify_dob, "");
    }
}
