//! Facet lists for the web client's filter selects

use axum::{extract::State, Json};
use tracing::debug;

use crate::facets::{facets, Facets};
use crate::AppState;

/// GET /api/ipbook/filters
pub async fn get_filters(State(state): State<AppState>) -> Json<Facets> {
    let snapshot = state.org_snapshot.get().await;
    let store = state.store.read().await;
    debug!(rows = store.len(), static_org = snapshot.is_some(), "Building facets");
    Json(facets(store.rows(), snapshot))
}
