//! ipbook-was library - IP-Book asset inventory service
//!
//! Holds the canonical record table in memory, answers filtered queries and
//! facet requests, and ingests spreadsheet uploads. The table is persisted to
//! a single JSON file after every mutation.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::sync::RwLock;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod facets;
pub mod import;
pub mod normalizer;
pub mod pagination;
pub mod query;
pub mod record;
pub mod store;

pub use error::{ApiError, ApiResult};

use facets::OrgSnapshot;
use import::workbook::{WorkbookCodec, XlsxCodec};
use store::RecordStore;

/// Default upload body limit (50 MiB)
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Record table. Read paths take the read lock; every read-modify-write
    /// sequence holds the write lock until its save completes.
    pub store: Arc<RwLock<RecordStore>>,
    /// Spreadsheet codec used by uploads
    pub codec: Arc<dyn WorkbookCodec>,
    /// Static organization snapshot for the filters endpoint
    pub org_snapshot: Arc<OrgSnapshot>,
    /// Maximum accepted upload body size
    pub upload_limit_bytes: usize,
}

impl AppState {
    /// Create new application state with the xlsx codec
    pub fn new(store: RecordStore, org_snapshot: OrgSnapshot, upload_limit_bytes: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            codec: Arc::new(XlsxCodec),
            org_snapshot: Arc::new(org_snapshot),
            upload_limit_bytes,
        }
    }

    /// Replace the spreadsheet codec
    pub fn with_codec(mut self, codec: Arc<dyn WorkbookCodec>) -> Self {
        self.codec = codec;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    // Uploads take the raw body, up to the configured limit
    let uploads = Router::new()
        .route("/api/ipbook/network/upload", post(api::upload_network))
        .route("/api/ipbook/server/upload", post(api::upload_server))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.upload_limit_bytes));

    let ipbook = Router::new()
        .route("/api/ipbook", post(api::query_rows))
        .route("/api/ipbook/filters", get(api::get_filters))
        .route(
            "/api/ipbook/:deptCd/:deviceName/:ipAddress",
            post(api::insert_row).put(api::update_row),
        );

    Router::new()
        .merge(ipbook)
        .merge(uploads)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
