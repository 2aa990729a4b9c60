//! In-memory stand-in for the ID Analyzer API.
//!
//! Accepts the same flat JSON payloads as the real service and answers with
//! the same envelope: a JSON object, with failures reported as
//! `{"error": {"code", "message"}}` under HTTP 200. Scans that request vault
//! storage create entries the vault routes can then list, edit and delete.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "test-key";

pub const ERR_INVALID_API_KEY: i64 = 1;
pub const ERR_INVALID_PARAMETER: i64 = 9;
pub const ERR_DUALSIDE_MISMATCH: i64 = 14;
pub const ERR_INVALID_REFERENCE: i64 = 15;
pub const ERR_ENTRY_NOT_FOUND: i64 = 20;
pub const ERR_IMAGE_NOT_FOUND: i64 = 21;

/// Fixed identity every scan "reads" from the document.
pub const SAMPLE_DOCUMENT_NUMBER: &str = "X1234567";
pub const SAMPLE_FIRST_NAME: &str = "JOHN";
pub const SAMPLE_LAST_NAME: &str = "DOE";
pub const SAMPLE_DOB: &str = "1990/01/01";

type Object = Map<String, Value>;

#[derive(Default)]
pub struct MockState {
    api_key: String,
    entries: HashMap<String, Object>,
    sessions: HashSet<String>,
    seq: u64,
    trained: bool,
}

pub type Db = Arc<RwLock<MockState>>;

pub fn app(api_key: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(MockState {
        api_key: api_key.to_string(),
        ..MockState::default()
    }));
    Router::new()
        .route("/", post(scan))
        .route("/docupass/create", post(docupass_create))
        .route("/docupass/validate", post(docupass_validate))
        .route("/vault/{action}", post(vault_action))
        .with_state(db)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock API listening");
    }
    axum::serve(listener, app(api_key)).await
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: i64,
    pub message: String,
}

fn error(code: i64, message: &str) -> Json<Value> {
    let body = ErrorBody {
        code,
        message: message.to_string(),
    };
    Json(json!({ "error": body }))
}

fn str_field<'a>(payload: &'a Object, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn bool_field(payload: &Object, key: &str) -> bool {
    payload.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn u64_field(payload: &Object, key: &str, default: u64) -> u64 {
    match payload.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(default),
        Some(Value::String(s)) => s.parse().unwrap_or(default),
        _ => default,
    }
}

/// Whichever of the URL or base64 variants of an input is present.
fn input<'a>(payload: &'a Object, url_key: &str, base64_key: &str) -> Option<&'a str> {
    [url_key, base64_key]
        .into_iter()
        .map(|k| str_field(payload, k))
        .find(|v| !v.is_empty())
}

fn authorized(state: &MockState, payload: &Object) -> bool {
    str_field(payload, "apikey") == state.api_key
}

fn next_createtime(state: &mut MockState) -> String {
    state.seq += 1;
    let s = state.seq;
    format!("2024/01/01 {:02}:{:02}:{:02}", s / 3600 % 24, s / 60 % 60, s % 60)
}

async fn scan(State(db): State<Db>, Json(payload): Json<Object>) -> Json<Value> {
    let mut state = db.write().await;
    if !authorized(&state, &payload) {
        return error(ERR_INVALID_API_KEY, "Invalid API key");
    }
    let Some(front) = input(&payload, "url", "file_base64") else {
        return error(ERR_INVALID_PARAMETER, "Missing document image");
    };
    let back = input(&payload, "url_back", "file_back_base64");
    if bool_field(&payload, "dualsidecheck") && back.is_some_and(|b| b != front) {
        return error(
            ERR_DUALSIDE_MISMATCH,
            "Information mismatch between front and back of document",
        );
    }

    let result = json!({
        "documentNumber": SAMPLE_DOCUMENT_NUMBER,
        "firstName": SAMPLE_FIRST_NAME,
        "lastName": SAMPLE_LAST_NAME,
        "fullName": format!("{SAMPLE_FIRST_NAME} {SAMPLE_LAST_NAME}"),
        "dob": SAMPLE_DOB,
        "expiry": "2030/12/31",
        "documentType": "D",
        "issuerOrg_iso2": "US",
    });

    let mut response = Object::new();
    response.insert("result".to_string(), result);
    response.insert("matchrate".to_string(), json!(1.0));

    let checks = [
        ("verify_documentno", SAMPLE_DOCUMENT_NUMBER.to_string(), "documentNumber"),
        ("verify_name", format!("{SAMPLE_FIRST_NAME} {SAMPLE_LAST_NAME}"), "name"),
        ("verify_dob", SAMPLE_DOB.to_string(), "dob"),
    ];
    let mut verification = Object::new();
    for (key, actual, label) in checks {
        let wanted = str_field(&payload, key);
        if !wanted.is_empty() {
            verification.insert(label.to_string(), json!(wanted.eq_ignore_ascii_case(&actual)));
        }
    }
    if !verification.is_empty() {
        let passed = verification.values().all(|v| v == &Value::Bool(true));
        response.insert(
            "verification".to_string(),
            json!({ "passed": passed, "result": verification }),
        );
    }

    let face = input(&payload, "faceurl", "face_base64");
    let video = input(&payload, "videourl", "video_base64");
    if face.is_some() || video.is_some() {
        response.insert(
            "face".to_string(),
            json!({ "isIdentical": true, "confidence": "0.912" }),
        );
    }

    if bool_field(&payload, "vault_save") {
        let id = Uuid::new_v4().simple().to_string();
        let mut entry = Object::new();
        entry.insert("id".to_string(), json!(id));
        entry.insert("createtime".to_string(), json!(next_createtime(&mut state)));
        entry.insert("documentNumber".to_string(), json!(SAMPLE_DOCUMENT_NUMBER));
        entry.insert("firstName".to_string(), json!(SAMPLE_FIRST_NAME));
        entry.insert("lastName".to_string(), json!(SAMPLE_LAST_NAME));
        for i in 1..=5 {
            let value = str_field(&payload, &format!("vault_customdata{i}"));
            entry.insert(format!("customdata{i}"), json!(value));
        }
        let mut images = vec![json!({ "id": Uuid::new_v4().simple().to_string(), "type": 0 })];
        if face.is_some() {
            images.push(json!({ "id": Uuid::new_v4().simple().to_string(), "type": 1 }));
        }
        entry.insert("image".to_string(), Value::Array(images));
        state.entries.insert(id.clone(), entry);
        response.insert("vaultid".to_string(), json!(id));
    }

    debug!(fields = payload.len(), "scan handled");
    Json(Value::Object(response))
}

async fn docupass_create(State(db): State<Db>, Json(payload): Json<Object>) -> Json<Value> {
    let mut state = db.write().await;
    if !authorized(&state, &payload) {
        return error(ERR_INVALID_API_KEY, "Invalid API key");
    }
    if str_field(&payload, "companyname").is_empty() {
        return error(ERR_INVALID_PARAMETER, "Company name required");
    }
    let kind = u64_field(&payload, "type", u64::MAX);
    if kind > 3 {
        return error(ERR_INVALID_PARAMETER, "Invalid DocuPass module");
    }

    let reference = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    state.sessions.insert(reference.clone());

    let mut response = json!({
        "reference": reference,
        "type": kind,
        "customid": str_field(&payload, "customid"),
        "url": format!("https://docupass.app/{reference}"),
        "expiry": 3600,
    });
    if kind == 1 || kind == 3 {
        response["qrcode"] = json!(format!("https://docupass.app/qrcode/{reference}.png"));
    }
    Json(response)
}

async fn docupass_validate(State(db): State<Db>, Json(payload): Json<Object>) -> Json<Value> {
    let state = db.read().await;
    if !authorized(&state, &payload) {
        return error(ERR_INVALID_API_KEY, "Invalid API key");
    }
    let reference = str_field(&payload, "reference");
    let hash = str_field(&payload, "hash");
    if state.sessions.contains(reference) && !hash.is_empty() {
        Json(json!({ "success": true }))
    } else {
        error(ERR_INVALID_REFERENCE, "Invalid reference code or hash")
    }
}

async fn vault_action(
    State(db): State<Db>,
    Path(action): Path<String>,
    Json(payload): Json<Object>,
) -> Json<Value> {
    let mut state = db.write().await;
    if !authorized(&state, &payload) {
        return error(ERR_INVALID_API_KEY, "Invalid API key");
    }
    debug!(%action, "vault request");
    match action.as_str() {
        "get" => vault_get(&state, &payload),
        "list" => vault_list(&state, &payload),
        "update" => vault_update(&mut state, &payload),
        "delete" => vault_delete(&mut state, &payload),
        "addimage" => vault_add_image(&mut state, &payload),
        "deleteimage" => vault_delete_image(&mut state, &payload),
        "searchface" => vault_search_face(&state, &payload),
        "train" => {
            state.trained = true;
            Json(json!({ "success": true }))
        }
        "trainstatus" => {
            let status = if state.trained { "trained" } else { "untrained" };
            Json(json!({ "status": status }))
        }
        _ => error(ERR_INVALID_PARAMETER, "Invalid vault action"),
    }
}

fn vault_get(state: &MockState, payload: &Object) -> Json<Value> {
    match state.entries.get(str_field(payload, "id")) {
        Some(entry) => Json(json!({ "data": entry })),
        None => error(ERR_ENTRY_NOT_FOUND, "Vault entry not found"),
    }
}

/// A `field<op>value` statement compared as strings.
struct Filter {
    field: String,
    op: &'static str,
    value: String,
}

impl Filter {
    fn parse(statement: &str) -> Option<Self> {
        // two-character operators first so ">=" is not read as ">"
        for op in [">=", "<=", "!=", "=", ">", "<"] {
            if let Some((field, value)) = statement.split_once(op) {
                return Some(Filter {
                    field: field.trim().to_string(),
                    op,
                    value: value.trim().to_string(),
                });
            }
        }
        None
    }

    fn matches(&self, entry: &Object) -> bool {
        let actual = match entry.get(&self.field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let actual = actual.as_str();
        let value = self.value.as_str();
        match self.op {
            ">=" => actual >= value,
            "<=" => actual <= value,
            "!=" => actual != value,
            "=" => actual == value,
            ">" => actual > value,
            "<" => actual < value,
            _ => false,
        }
    }
}

fn sort_key(entry: &Object, field: &str) -> String {
    match entry.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn vault_list(state: &MockState, payload: &Object) -> Json<Value> {
    let statements: Vec<&str> = payload
        .get("filter")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if statements.len() > 5 {
        return error(ERR_INVALID_PARAMETER, "Too many filter statements");
    }
    let mut filters = Vec::with_capacity(statements.len());
    for statement in statements {
        match Filter::parse(statement) {
            Some(filter) => filters.push(filter),
            None => return error(ERR_INVALID_PARAMETER, "Invalid filter statement"),
        }
    }

    let orderby = match str_field(payload, "orderby") {
        "" => "createtime",
        field => field,
    };
    let descending = !str_field(payload, "sort").eq_ignore_ascii_case("ASC");
    let limit = u64_field(payload, "limit", 10) as usize;
    let offset = u64_field(payload, "offset", 0) as usize;

    let mut matched: Vec<&Object> = state
        .entries
        .values()
        .filter(|e| filters.iter().all(|f| f.matches(e)))
        .collect();
    matched.sort_by_key(|e| sort_key(e, orderby));
    if descending {
        matched.reverse();
    }
    let total = matched.len();
    let items: Vec<&Object> = matched.into_iter().skip(offset).take(limit).collect();

    Json(json!({
        "items": items,
        "limit": limit,
        "offset": offset,
        "total": total,
    }))
}

fn vault_update(state: &mut MockState, payload: &Object) -> Json<Value> {
    let Some(entry) = state.entries.get_mut(str_field(payload, "id")) else {
        return error(ERR_ENTRY_NOT_FOUND, "Vault entry not found");
    };
    for (key, value) in payload {
        if !matches!(key.as_str(), "id" | "apikey" | "client" | "createtime" | "image") {
            entry.insert(key.clone(), value.clone());
        }
    }
    Json(json!({ "success": true }))
}

fn vault_delete(state: &mut MockState, payload: &Object) -> Json<Value> {
    let ids: Vec<&str> = match payload.get("id") {
        Some(Value::Array(ids)) => ids.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(id)) => vec![id.as_str()],
        _ => Vec::new(),
    };
    let removed = ids
        .iter()
        .filter(|id| state.entries.remove(**id).is_some())
        .count();
    if removed == 0 {
        return error(ERR_ENTRY_NOT_FOUND, "Vault entry not found");
    }
    Json(json!({ "success": true }))
}

fn images_mut(entry: &mut Object) -> &mut Vec<Value> {
    if !matches!(entry.get("image"), Some(Value::Array(_))) {
        entry.insert("image".to_string(), Value::Array(Vec::new()));
    }
    match entry.get_mut("image") {
        Some(Value::Array(images)) => images,
        _ => unreachable!("image slot was just set to an array"),
    }
}

fn vault_add_image(state: &mut MockState, payload: &Object) -> Json<Value> {
    if input(payload, "imageurl", "image").is_none() {
        return error(ERR_INVALID_PARAMETER, "Missing image");
    }
    let kind = u64_field(payload, "type", 0);
    if kind > 1 {
        return error(ERR_INVALID_PARAMETER, "Invalid image type");
    }
    let Some(entry) = state.entries.get_mut(str_field(payload, "id")) else {
        return error(ERR_ENTRY_NOT_FOUND, "Vault entry not found");
    };
    let image = json!({ "id": Uuid::new_v4().simple().to_string(), "type": kind });
    images_mut(entry).push(image.clone());
    Json(json!({ "success": true, "image": image }))
}

fn vault_delete_image(state: &mut MockState, payload: &Object) -> Json<Value> {
    let Some(entry) = state.entries.get_mut(str_field(payload, "id")) else {
        return error(ERR_ENTRY_NOT_FOUND, "Vault entry not found");
    };
    let image_id = str_field(payload, "imageid");
    let images = images_mut(entry);
    let before = images.len();
    images.retain(|img| img.get("id").and_then(Value::as_str) != Some(image_id));
    if images.len() == before {
        return error(ERR_IMAGE_NOT_FOUND, "Image not found");
    }
    Json(json!({ "success": true }))
}

/// Every entry holding a face image is reported at similarity 0.9.
fn vault_search_face(state: &MockState, payload: &Object) -> Json<Value> {
    const SIMILARITY: f64 = 0.9;
    if input(payload, "imageurl", "image").is_none() {
        return error(ERR_INVALID_PARAMETER, "Missing image");
    }
    let max_entry = u64_field(payload, "maxentry", 10) as usize;
    let threshold = payload.get("threshold").and_then(Value::as_f64).unwrap_or(0.5);
    let has_face = |e: &&Object| {
        e.get("image")
            .and_then(Value::as_array)
            .is_some_and(|imgs| imgs.iter().any(|i| i.get("type") == Some(&json!(1))))
    };
    let mut items: Vec<Value> = if SIMILARITY >= threshold {
        state
            .entries
            .values()
            .filter(has_face)
            .map(|e| json!({ "id": e["id"], "similarity": SIMILARITY }))
            .collect()
    } else {
        Vec::new()
    };
    items.truncate(max_entry);
    Json(json!({ "items": items, "total": items.len() }))
}
