use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, DEFAULT_API_KEY};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(uri: &str, body: &Value) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

/// POST `body` with the default API key merged in; returns the JSON reply.
async fn call(app: &Router, uri: &str, mut body: Value) -> Value {
    body["apikey"] = json!(DEFAULT_API_KEY);
    let resp = app.clone().oneshot(json_request(uri, &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

async fn save_scan(app: &Router, customdata1: &str) -> String {
    let reply = call(
        app,
        "/",
        json!({
            "url": "https://example.com/front.jpg",
            "faceurl": "https://example.com/face.jpg",
            "vault_save": true,
            "vault_customdata1": customdata1,
        }),
    )
    .await;
    reply["vaultid"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn wrong_api_key_is_error_1() {
    let app = app(DEFAULT_API_KEY);
    let resp = app
        .oneshot(json_request("/", &json!({"apikey": "nope", "url": "https://x.io/a.jpg"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], 1);
}

#[tokio::test]
async fn malformed_json_is_rejected_by_extractor() {
    let app = app(DEFAULT_API_KEY);
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body("{not json".to_string())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_client_error());
}

// --- scan ---

#[tokio::test]
async fn scan_returns_document_fields() {
    let app = app(DEFAULT_API_KEY);
    let body = call(&app, "/", json!({"file_base64": "aGVsbG8="})).await;
    assert_eq!(body["result"]["documentNumber"], "X1234567");
    assert!(body.get("vaultid").is_none());
    assert!(body.get("face").is_none());
}

#[tokio::test]
async fn scan_without_document_fails() {
    let app = app(DEFAULT_API_KEY);
    let body = call(&app, "/", json!({"url": ""})).await;
    assert_eq!(body["error"]["code"], 9);
}

#[tokio::test]
async fn dualside_mismatch_is_error_14() {
    let app = app(DEFAULT_API_KEY);
    let body = call(
        &app,
        "/",
        json!({
            "url": "https://x.io/front.jpg",
            "url_back": "https://x.io/other.jpg",
            "dualsidecheck": true,
        }),
    )
    .await;
    assert_eq!(body["error"]["code"], 14);

    // same images on both sides pass
    let body = call(
        &app,
        "/",
        json!({
            "url": "https://x.io/front.jpg",
            "url_back": "https://x.io/front.jpg",
            "dualsidecheck": true,
        }),
    )
    .await;
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn scan_reports_verification_results() {
    let app = app(DEFAULT_API_KEY);
    let body = call(
        &app,
        "/",
        json!({
            "url": "https://x.io/front.jpg",
            "verify_name": "john doe",
            "verify_dob": "1980/05/05",
            "verify_documentno": "",
        }),
    )
    .await;
    let verification = &body["verification"];
    assert_eq!(verification["passed"], false);
    assert_eq!(verification["result"]["name"], true);
    assert_eq!(verification["result"]["dob"], false);
    assert!(verification["result"].get("documentNumber").is_none());
}

// --- docupass ---

#[tokio::test]
async fn docupass_create_then_validate() {
    let app = app(DEFAULT_API_KEY);
    let created = call(
        &app,
        "/docupass/create",
        json!({"companyname": "Acme", "type": 1, "customid": "u-42"}),
    )
    .await;
    let reference = created["reference"].as_str().unwrap().to_string();
    assert_eq!(reference.len(), 8);
    assert_eq!(created["customid"], "u-42");
    assert!(created["qrcode"].as_str().unwrap().contains(&reference));

    let ok = call(
        &app,
        "/docupass/validate",
        json!({"reference": reference, "hash": "abc"}),
    )
    .await;
    assert_eq!(ok["success"], true);

    let bad = call(
        &app,
        "/docupass/validate",
        json!({"reference": "UNKNOWN0", "hash": "abc"}),
    )
    .await;
    assert!(bad.get("success").is_none());
    assert_eq!(bad["error"]["code"], 15);
}

#[tokio::test]
async fn docupass_iframe_has_no_qrcode() {
    let app = app(DEFAULT_API_KEY);
    let created = call(&app, "/docupass/create", json!({"companyname": "Acme", "type": 0})).await;
    assert!(created.get("qrcode").is_none());

    let missing = call(&app, "/docupass/create", json!({"companyname": "", "type": 0})).await;
    assert_eq!(missing["error"]["code"], 9);
}

// --- vault ---

#[tokio::test]
async fn vault_get_update_delete() {
    let app = app(DEFAULT_API_KEY);
    let id = save_scan(&app, "first").await;

    let got = call(&app, "/vault/get", json!({"id": id})).await;
    assert_eq!(got["data"]["customdata1"], "first");

    let updated = call(&app, "/vault/update", json!({"id": id, "customdata2": "note"})).await;
    assert_eq!(updated["success"], true);
    let got = call(&app, "/vault/get", json!({"id": id})).await;
    assert_eq!(got["data"]["customdata2"], "note");

    let deleted = call(&app, "/vault/delete", json!({"id": [id]})).await;
    assert_eq!(deleted["success"], true);
    let gone = call(&app, "/vault/get", json!({"id": id})).await;
    assert_eq!(gone["error"]["code"], 20);
}

#[tokio::test]
async fn vault_list_filters_sorts_and_pages() {
    let app = app(DEFAULT_API_KEY);
    for tag in ["a", "b", "c"] {
        save_scan(&app, tag).await;
    }

    let all = call(&app, "/vault/list", json!({"orderby": "customdata1", "sort": "ASC"})).await;
    assert_eq!(all["total"], 3);
    let tags: Vec<&str> = all["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["customdata1"].as_str().unwrap())
        .collect();
    assert_eq!(tags, ["a", "b", "c"]);

    let filtered = call(&app, "/vault/list", json!({"filter": ["customdata1>=b"]})).await;
    assert_eq!(filtered["total"], 2);

    let paged = call(
        &app,
        "/vault/list",
        json!({"orderby": "customdata1", "sort": "DESC", "limit": 1, "offset": 1}),
    )
    .await;
    assert_eq!(paged["total"], 3);
    assert_eq!(paged["items"][0]["customdata1"], "b");

    let too_many = call(
        &app,
        "/vault/list",
        json!({"filter": ["a=1", "b=1", "c=1", "d=1", "e=1", "f=1"]}),
    )
    .await;
    assert_eq!(too_many["error"]["code"], 9);
}

#[tokio::test]
async fn vault_images_and_face_search() {
    let app = app(DEFAULT_API_KEY);
    let id = save_scan(&app, "face").await;

    let added = call(
        &app,
        "/vault/addimage",
        json!({"id": id, "imageurl": "https://x.io/f2.jpg", "type": 1}),
    )
    .await;
    let image_id = added["image"]["id"].as_str().unwrap().to_string();

    let removed = call(&app, "/vault/deleteimage", json!({"id": id, "imageid": image_id})).await;
    assert_eq!(removed["success"], true);
    let again = call(&app, "/vault/deleteimage", json!({"id": id, "imageid": image_id})).await;
    assert_eq!(again["error"]["code"], 21);

    let found = call(
        &app,
        "/vault/searchface",
        json!({"imageurl": "https://x.io/q.jpg", "maxentry": 10, "threshold": 0.5}),
    )
    .await;
    assert_eq!(found["items"][0]["id"], id.as_str());

    let strict = call(
        &app,
        "/vault/searchface",
        json!({"imageurl": "https://x.io/q.jpg", "threshold": 0.95}),
    )
    .await;
    assert_eq!(strict["total"], 0);
}

#[tokio::test]
async fn vault_training_status_flips() {
    let app = app(DEFAULT_API_KEY);
    let before = call(&app, "/vault/trainstatus", json!({})).await;
    assert_eq!(before["status"], "untrained");
    call(&app, "/vault/train", json!({})).await;
    let after = call(&app, "/vault/trainstatus", json!({})).await;
    assert_eq!(after["status"], "trained");
}

#[tokio::test]
async fn unknown_vault_action_fails() {
    let app = app(DEFAULT_API_KEY);
    let body = call(&app, "/vault/explode", json!({})).await;
    assert_eq!(body["error"]["code"], 9);
}
