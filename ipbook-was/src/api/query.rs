//! Inventory query endpoint

use axum::{body::Bytes, extract::State, Json};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::response_timestamp;
use crate::pagination::{PageRequest, Pagination};
use crate::query::{query, QueryFilter};
use crate::record::CanonicalRecord;
use crate::{ApiError, ApiResult, AppState};

const QUERY_PATH: &str = "/api/ipbook";

/// Query request body. Both parts are optional; a part that is not an object
/// reads as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    #[serde(deserialize_with = "deserialize_section")]
    pub filter: QueryFilter,
    #[serde(deserialize_with = "deserialize_section")]
    pub page: PageRequest,
}

fn deserialize_section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).map_err(D::Error::custom),
        _ => Ok(T::default()),
    }
}

impl QueryRequest {
    /// Parse a raw request body. An empty body or `null` is an empty query;
    /// malformed JSON or a non-object body is rejected.
    pub fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Null) => Ok(Self::default()),
            Ok(value @ Value::Object(_)) => serde_json::from_value(value)
                .map_err(|e| ApiError::BadRequest(format!("Invalid query body: {}", e))),
            Ok(_) => Err(ApiError::BadRequest("Query body must be a JSON object".to_string())),
            Err(e) => Err(ApiError::BadRequest(format!("Invalid JSON body: {}", e))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub timestamp: String,
    pub status: u16,
    pub path: String,
    pub data: Vec<CanonicalRecord>,
    pub page: Pagination,
}

/// POST /api/ipbook
///
/// A missing body is an empty query. Loosely typed values (numeric strings
/// for pages, numbers for filter text) are coerced rather than rejected.
pub async fn query_rows(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<QueryResponse>> {
    let request = QueryRequest::from_body(&body)?;
    let sort = request.filter.sort();
    debug!(filter = ?request.filter, page = ?request.page, "Query");

    let result = {
        let store = state.store.read().await;
        query(store.rows(), &request.filter, sort, request.page)
    };

    Ok(Json(QueryResponse {
        timestamp: response_timestamp(),
        status: 200,
        path: QUERY_PATH.to_string(),
        data: result.rows,
        page: result.pagination,
    }))
}
