//! Integration tests for ipbook-was API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Query filtering, sorting, pagination and IP masking
//! - Facet lists and the org tree
//! - Single-row insert and update by composite key
//! - Bulk upload: multipart decoding, validation, duplicates, rejection report

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use ipbook_was::facets::OrgSnapshot;
use ipbook_was::import::workbook::{SheetRow, WorkbookCodec, XlsxCodec};
use ipbook_was::normalizer::normalize_at;
use ipbook_was::store::RecordStore;
use ipbook_was::{build_router, AppState, DEFAULT_UPLOAD_LIMIT_BYTES};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const BOUNDARY: &str = "----ipbookTestBoundary";

/// Test helper: app over a temp root seeded with `rows`
fn setup_app(rows: Vec<Value>) -> (axum::Router, AppState, TempDir) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let records = rows
        .iter()
        .map(|raw| normalize_at(raw, "2024-01-01T00:00:00").expect("Should normalize"))
        .collect();
    let store = RecordStore::with_rows(dir.path().join("ipbook-data.json"), records);
    let state = AppState::new(
        store,
        OrgSnapshot::new(dir.path().join("filterSample.json")),
        DEFAULT_UPLOAD_LIMIT_BYTES,
    );
    (build_router(state.clone()), state, dir)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn sheet_row(value: Value) -> SheetRow {
    match value {
        Value::Object(map) => map,
        _ => panic!("sheet rows are objects"),
    }
}

fn multipart_body(file: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nignored\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"network.xlsx\"\r\n\
          Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n",
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn seed() -> Vec<Value> {
    vec![
        json!({
            "ipAddress": "10.2.3.40", "netCategory": "IP", "netType": "IMS",
            "deviceName": "core-1", "deptCd": "D100", "deptNm": "서울IP운용부",
            "bonbuNm": "수도권", "centerNm": "서부센터", "bumunNm": "네트워크부문",
            "updateDt": "2024-01-02T10:00:00"
        }),
        json!({
            "ipAddress": "9.255.255.255", "netCategory": "전송", "netType": "-",
            "deviceName": "edge-1", "deptCd": "D200", "assetType": "server",
            "updateDt": "2024-01-03T09:00:00"
        }),
        json!({
            "ipAddress": "10.2.3.4", "netCategory": "IP", "netType": "",
            "deviceName": "core-2", "deptCd": "D100",
            "createDt": "2024-01-01T08:00:00"
        }),
    ]
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _, _dir) = setup_app(vec![]);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ipbook-was");
    assert!(body["version"].is_string());
}

// =============================================================================
// Query
// =============================================================================

#[tokio::test]
async fn test_query_default_sort_and_masking() {
    let (app, _, _dir) = setup_app(seed());
    let response = app
        .oneshot(json_request("POST", "/api/ipbook", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], 200);
    assert_eq!(body["path"], "/api/ipbook");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["page"], json!({"page": 1, "pagePerPage": 3, "totalCount": 3}));

    let ips: Vec<_> = body["data"].as_array().unwrap().iter().map(|r| r["ipAddress"].clone()).collect();
    assert_eq!(ips, vec![json!("9.255.255.***"), json!("10.2.3.***"), json!("10.2.3.***")]);
}

#[tokio::test]
async fn test_query_ip_sort_with_show_ip() {
    let (app, _, _dir) = setup_app(seed());
    let request = json_request(
        "POST",
        "/api/ipbook",
        json!({"filter": {"sortKey": "IP주소", "showIp": "true"}}),
    );
    let body = extract_json(app.oneshot(request).await.unwrap().into_body()).await;
    let ips: Vec<_> = body["data"].as_array().unwrap().iter().map(|r| r["ipAddress"].clone()).collect();
    assert_eq!(ips, vec![json!("9.255.255.255"), json!("10.2.3.4"), json!("10.2.3.40")]);
}

#[tokio::test]
async fn test_query_filters_and_pagination() {
    let (app, _, _dir) = setup_app(seed());
    let request = json_request(
        "POST",
        "/api/ipbook",
        json!({
            "filter": {"netCategory": "IP", "assetType": "network", "showIp": true, "sortKey": "IP주소"},
            "page": {"page": 2, "pagePerPage": 1}
        }),
    );
    let body = extract_json(app.oneshot(request).await.unwrap().into_body()).await;
    assert_eq!(body["page"]["totalCount"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["ipAddress"], "10.2.3.40");
    assert_eq!(body["data"][0]["assetType"], "네트워크");
}

#[tokio::test]
async fn test_query_without_body_returns_everything() {
    let (app, _, _dir) = setup_app(seed());
    let request = Request::builder()
        .method("POST")
        .uri("/api/ipbook")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["page"]["totalCount"], 3);
}

#[tokio::test]
async fn test_query_coerces_loosely_typed_values() {
    let (app, _, _dir) = setup_app(seed());
    let request = json_request(
        "POST",
        "/api/ipbook",
        json!({
            "filter": {"baseDt": 0, "netType": "IMS", "showIp": true},
            "page": {"page": "1", "pagePerPage": "10"}
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["page"], json!({"page": 1, "pagePerPage": 10, "totalCount": 1}));
    assert_eq!(body["data"][0]["ipAddress"], "10.2.3.40");
}

#[tokio::test]
async fn test_query_malformed_body_is_bad_request() {
    let (app, _, _dir) = setup_app(seed());
    let request = Request::builder()
        .method("POST")
        .uri("/api/ipbook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"filter\": {"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_query_non_positive_page_is_empty() {
    let (app, _, _dir) = setup_app(seed());
    let request = json_request(
        "POST",
        "/api/ipbook",
        json!({"page": {"page": 0, "pagePerPage": 2}}),
    );
    let body = extract_json(app.oneshot(request).await.unwrap().into_body()).await;
    assert_eq!(body["page"]["page"], 0);
    assert_eq!(body["page"]["totalCount"], 3);
    assert!(body["data"].as_array().unwrap().is_empty());
}

// =============================================================================
// Facets
// =============================================================================

#[tokio::test]
async fn test_filters_endpoint() {
    let (app, _, _dir) = setup_app(seed());
    let request = Request::builder()
        .uri("/api/ipbook/filters")
        .body(Body::empty())
        .unwrap();
    let body = extract_json(app.oneshot(request).await.unwrap().into_body()).await;

    assert_eq!(body["netCategoryList"], json!(["IP", "전송"]));
    assert_eq!(body["netTypeList"], json!(["IMS"]));
    assert_eq!(body["osTypeList"], json!([]));
    assert_eq!(body["orgList"][0]["orgNm"], "네트워크부문");
    assert_eq!(body["orgList"][0]["children"][0]["orgNm"], "수도권");
}

#[tokio::test]
async fn test_filters_use_static_org_snapshot() {
    let (app, _, dir) = setup_app(seed());
    std::fs::write(
        dir.path().join("filterSample.json"),
        r#"[{"orgNm": "고정부문", "children": []}]"#,
    )
    .unwrap();

    let request = Request::builder()
        .uri("/api/ipbook/filters")
        .body(Body::empty())
        .unwrap();
    let body = extract_json(app.oneshot(request).await.unwrap().into_body()).await;
    assert_eq!(body["orgList"], json!([{"orgNm": "고정부문", "children": []}]));
}

// =============================================================================
// Single-row insert / update
// =============================================================================

#[tokio::test]
async fn test_insert_row_path_overrides_body_and_persists() {
    let (app, state, dir) = setup_app(seed());
    let request = json_request(
        "POST",
        "/api/ipbook/D300/new-sw/10.9.9.9",
        json!({"ipAddress": "1.1.1.1", "netCategory": "IP", "comment": "added"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["path"], "/api/ipbook/D300/new-sw/10.9.9.9");
    assert_eq!(body["row"]["ipAddress"], "10.9.9.9");
    assert_eq!(body["row"]["deptCd"], "D300");
    assert_eq!(body["row"]["assetType"], "네트워크");
    assert_eq!(body["row"]["createDt"], body["row"]["updateDt"]);

    let store = state.store.read().await;
    assert_eq!(store.len(), 4);
    assert_eq!(store.rows()[0].device_name, "new-sw");

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("ipbook-data.json")).unwrap()).unwrap();
    assert_eq!(saved.as_array().unwrap().len(), 4);
    assert_eq!(saved[0]["comment"], "added");
}

#[tokio::test]
async fn test_update_row_merges_and_keeps_create_dt() {
    let (app, state, _dir) = setup_app(seed());
    let original_id = state.store.read().await.rows()[2].id.clone();

    let request = json_request(
        "PUT",
        "/api/ipbook/D100/core-2/10.2.3.4",
        json!({"comment": "updated", "createDt": "1999-01-01T00:00:00", "assetType": "SERVER"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["row"]["comment"], "updated");
    assert_eq!(body["row"]["createDt"], "2024-01-01T08:00:00");
    assert_eq!(body["row"]["assetType"], "서버");
    assert_eq!(body["row"]["netCategory"], "IP");
    assert_eq!(body["row"]["id"], json!(original_id));

    let store = state.store.read().await;
    assert_eq!(store.len(), 3, "update replaces in place");
    assert_eq!(store.rows()[2].comment.as_deref(), Some("updated"));
}

#[tokio::test]
async fn test_row_ids_stay_unique_on_insert_and_update() {
    let (app, state, _dir) = setup_app(seed());
    let (first_id, second_id) = {
        let store = state.store.read().await;
        (store.rows()[0].id.clone(), store.rows()[2].id.clone())
    };

    let request = json_request("POST", "/api/ipbook/D300/new-sw/10.9.9.9", json!({"id": first_id}));
    let body = extract_json(app.clone().oneshot(request).await.unwrap().into_body()).await;
    assert_ne!(body["row"]["id"], json!(first_id));

    let request = json_request("PUT", "/api/ipbook/D100/core-2/10.2.3.4", json!({"id": first_id}));
    let body = extract_json(app.oneshot(request).await.unwrap().into_body()).await;
    assert_eq!(body["row"]["id"], json!(second_id));

    let store = state.store.read().await;
    let mut ids: Vec<&str> = store.rows().iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_update_unknown_key_is_404() {
    let (app, _, _dir) = setup_app(seed());
    let request = json_request("PUT", "/api/ipbook/D999/nope/10.0.0.1", json!({"comment": "x"}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_key_differs_from_duplicate_key() {
    // The edit key is (deptCd, deviceName, ipAddress) while uploads dedupe on
    // (ipAddress, netCategory): the same IP under another department is a
    // different row for edits but a duplicate for uploads.
    let (app, state, _dir) = setup_app(seed());

    let request = json_request("PUT", "/api/ipbook/D999/core-2/10.2.3.4", json!({}));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let workbook = XlsxCodec
        .encode_rows(
            "Sheet1",
            &[sheet_row(json!({"IP주소": "10.2.3.4", "망속성": "IP", "장비명": "core-2", "부서코드": "D999"}))],
        )
        .unwrap();
    let response = app
        .oneshot(upload_request("/api/ipbook/network/upload", multipart_body(&workbook)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["duplicateCount"], 1);
    assert_eq!(state.store.read().await.len(), 3);
}

// =============================================================================
// Bulk upload
// =============================================================================

#[tokio::test]
async fn test_upload_counts_and_rejection_report() {
    let (app, state, _dir) = setup_app(seed());
    let workbook = XlsxCodec
        .encode_rows(
            "Sheet1",
            &[
                sheet_row(json!({"IP주소": "10.5.0.1", "망속성": "IP", "장비명": "sw-a", "부서코드": "D100", "백신설치여부": "yes"})),
                sheet_row(json!({"IP주소": "10.5.0.1", "망속성": "IP", "장비명": "sw-b", "부서코드": "D100"})),
                sheet_row(json!({"IP주소": "10.2.3.40", "망속성": "IP", "장비명": "sw-c", "부서코드": "D100"})),
                sheet_row(json!({"IP주소": "10.5.0.2", "망속성": "IP", "장비명": "", "부서코드": "D100"})),
            ],
        )
        .unwrap();

    let response = app
        .oneshot(upload_request("/api/ipbook/server/upload", multipart_body(&workbook)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["insertedCount"], 1);
    assert_eq!(body["duplicateCount"], 2);
    assert_eq!(body["validationFailCount"], 1);

    let name = body["errorFileName"].as_str().unwrap();
    assert!(name.starts_with("upload_error_") && name.ends_with(".xlsx"));

    let report = general_purpose::STANDARD
        .decode(body["errorFileBase64"].as_str().unwrap())
        .unwrap();
    let rejected = XlsxCodec.decode_rows(&report).unwrap();
    assert_eq!(rejected.len(), 3);
    assert_eq!(rejected[0]["reason"], "중복: IP + 망속성(netCategory)");
    assert_eq!(rejected[2]["reason"], "필수 누락: deptCd / deviceName / ipAddress");

    let store = state.store.read().await;
    assert_eq!(store.len(), 4);
    let inserted = &store.rows()[0];
    assert_eq!(inserted.ip_address, "10.5.0.1");
    assert_eq!(inserted.asset_type, "서버");
    assert_eq!(inserted.vaccine_yn.as_deref(), Some("Y"));
}

#[tokio::test]
async fn test_upload_without_rejections_has_null_report() {
    let (app, _, _dir) = setup_app(vec![]);
    let workbook = XlsxCodec
        .encode_rows(
            "Sheet1",
            &[sheet_row(json!({"ipAddress": "10.6.0.1", "deviceName": "sw", "deptCd": "D1"}))],
        )
        .unwrap();
    let response = app
        .oneshot(upload_request("/api/ipbook/network/upload", multipart_body(&workbook)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["insertedCount"], 1);
    assert_eq!(body["errorFileBase64"], Value::Null);
    assert_eq!(body["errorFileName"], Value::Null);
}

#[tokio::test]
async fn test_upload_without_file_part_is_400() {
    let (app, _, _dir) = setup_app(vec![]);
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{BOUNDARY}--\r\n"
    );
    let response = app
        .oneshot(upload_request("/api/ipbook/network/upload", body.into_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_upload_non_multipart_is_400() {
    let (app, _, _dir) = setup_app(vec![]);
    let response = app
        .oneshot(json_request("POST", "/api/ipbook/network/upload", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_garbage_workbook_is_500() {
    let (app, state, _dir) = setup_app(seed());
    let response = app
        .oneshot(upload_request("/api/ipbook/network/upload", multipart_body(b"not a workbook")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.store.read().await.len(), 3);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(
        RecordStore::new(dir.path().join("ipbook-data.json")),
        OrgSnapshot::new(dir.path().join("filterSample.json")),
        64,
    );
    let app = build_router(state);
    let response = app
        .oneshot(upload_request("/api/ipbook/network/upload", vec![b'x'; 1024]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
