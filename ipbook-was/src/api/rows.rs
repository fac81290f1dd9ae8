//! Single-row insert and update
//!
//! Both endpoints address a row by the composite key (department code, device
//! name, IP address) carried in the path. Path values override the body.

use axum::{
    extract::{Path, State},
    Json,
};
use ipbook_common::time::civil_now;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::response_timestamp;
use crate::normalizer::normalize;
use crate::record::{canonical_asset_label, CanonicalRecord, NETWORK_LABEL};
use crate::{ApiError, ApiResult, AppState};

/// Composite row key from the request path
type RowKey = (String, String, String);

#[derive(Debug, Serialize)]
pub struct RowResponse {
    pub timestamp: String,
    pub status: u16,
    pub path: String,
    pub row: CanonicalRecord,
}

fn row_path((dept_cd, device_name, ip_address): &RowKey) -> String {
    format!("/api/ipbook/{dept_cd}/{device_name}/{ip_address}")
}

/// Request body as an object. An absent body reads as empty.
fn body_object(body: Option<Json<Value>>) -> ApiResult<Map<String, Value>> {
    match body.map(|Json(value)| value) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ApiError::BadRequest("row body must be a JSON object".to_string())),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        _ => false,
    }
}

fn apply_key(row: &mut Map<String, Value>, (dept_cd, device_name, ip_address): &RowKey) {
    row.insert("deptCd".into(), Value::String(dept_cd.clone()));
    row.insert("deviceName".into(), Value::String(device_name.clone()));
    row.insert("ipAddress".into(), Value::String(ip_address.clone()));
}

fn asset_label(value: Option<&Value>) -> String {
    canonical_asset_label(value.and_then(Value::as_str).unwrap_or(""))
}

fn to_record(row: Map<String, Value>) -> ApiResult<CanonicalRecord> {
    normalize(&Value::Object(row))
        .ok_or_else(|| ApiError::Internal("row could not be normalized".to_string()))
}

/// POST /api/ipbook/:deptCd/:deviceName/:ipAddress
///
/// Prepends a new row. `assetType` defaults to network; `createDt` is taken
/// from the body when present.
pub async fn insert_row(
    State(state): State<AppState>,
    Path(key): Path<RowKey>,
    body: Option<Json<Value>>,
) -> ApiResult<Json<RowResponse>> {
    let mut row = body_object(body)?;
    apply_key(&mut row, &key);

    if is_blank(row.get("assetType")) {
        row.insert("assetType".into(), Value::String(NETWORK_LABEL.to_string()));
    }
    let asset_type = asset_label(row.get("assetType"));
    row.insert("assetType".into(), Value::String(asset_type));

    let now = civil_now();
    let create_dt = ["createDt", "createdAt"]
        .iter()
        .map(|k| row.get(*k))
        .find(|v| !is_blank(*v))
        .flatten()
        .cloned()
        .unwrap_or_else(|| Value::String(now.clone()));
    row.insert("createDt".into(), create_dt);
    row.insert("updateDt".into(), Value::String(now));

    let record = to_record(row)?;
    let record = state.store.write().await.insert_front(record).await?;
    info!(id = %record.id, ip = %record.ip_address, "Inserted row");

    Ok(Json(RowResponse {
        timestamp: response_timestamp(),
        status: 200,
        path: row_path(&key),
        row: record,
    }))
}

/// PUT /api/ipbook/:deptCd/:deviceName/:ipAddress
///
/// Merges the body over the existing row. The existing `id` and `createDt`
/// are kept.
pub async fn update_row(
    State(state): State<AppState>,
    Path(key): Path<RowKey>,
    body: Option<Json<Value>>,
) -> ApiResult<Json<RowResponse>> {
    let body = body_object(body)?;
    let path = row_path(&key);

    let mut store = state.store.write().await;
    let (dept_cd, device_name, ip_address) = &key;
    let index = store
        .find_index_by_key(dept_cd, device_name, ip_address)
        .ok_or_else(|| ApiError::NotFound(path.clone()))?;
    let existing = &store.rows()[index];

    let now = civil_now();
    let asset_type = match body.get("assetType") {
        Some(v) if !v.is_null() => asset_label(Some(v)),
        _ => existing.asset_type.clone(),
    };
    let create_dt = existing
        .create_dt
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| now.clone());

    let id = existing.id.clone();
    let mut merged = existing.to_map();
    merged.extend(body);
    apply_key(&mut merged, &key);
    merged.insert("id".into(), Value::String(id));
    merged.insert("assetType".into(), Value::String(asset_type));
    merged.insert("createDt".into(), Value::String(create_dt));
    merged.insert("updateDt".into(), Value::String(now));

    let record = to_record(merged)?;
    store.replace_at(index, record.clone()).await?;
    info!(id = %record.id, ip = %record.ip_address, "Updated row");

    Ok(Json(RowResponse {
        timestamp: response_timestamp(),
        status: 200,
        path,
        row: record,
    }))
}
