//! Bulk spreadsheet upload endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};

use crate::import::{pipeline::ImportSummary, run_import};
use crate::record::AssetType;
use crate::{ApiResult, AppState};

/// POST /api/ipbook/network/upload
pub async fn upload_network(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ImportSummary>> {
    upload(state, &headers, &body, AssetType::Network).await
}

/// POST /api/ipbook/server/upload
pub async fn upload_server(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ImportSummary>> {
    upload(state, &headers, &body, AssetType::Server).await
}

async fn upload(
    state: AppState,
    headers: &HeaderMap,
    body: &[u8],
    asset_type: AssetType,
) -> ApiResult<Json<ImportSummary>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let summary = run_import(&state.store, state.codec.as_ref(), content_type, body, asset_type).await?;
    Ok(Json(summary))
}
