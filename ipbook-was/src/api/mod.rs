//! HTTP API handlers for ipbook-was

pub mod filters;
pub mod health;
pub mod query;
pub mod rows;
pub mod upload;

pub use filters::get_filters;
pub use health::health_routes;
pub use query::query_rows;
pub use rows::{insert_row, update_row};
pub use upload::{upload_network, upload_server};

use chrono::{SecondsFormat, Utc};

/// Response timestamp (UTC, millisecond precision)
pub(crate) fn response_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
