//! Bulk spreadsheet import
//!
//! 1. [`multipart`] pulls the uploaded file out of the raw request body
//! 2. [`workbook`] decodes it into row objects
//! 3. [`pipeline`] validates, deduplicates and inserts each row
//! 4. [`report`] encodes the rejected rows for download

pub mod multipart;
pub mod pipeline;
pub mod report;
pub mod workbook;

use chrono::Utc;
use ipbook_common::time::civil_now;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::record::AssetType;
use crate::store::RecordStore;
use multipart::MultipartError;
use pipeline::{ImportSummary, RejectReason};
use workbook::WorkbookCodec;

pub use multipart::{extract_file_part, FilePart};
pub use pipeline::{import_rows, ImportOutcome, Rejection};
pub use workbook::XlsxCodec;

/// Failures that abort an upload as a whole
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("xlsx parser error: {0}")]
    Workbook(ipbook_common::Error),

    #[error("save failed: {0}")]
    Save(ipbook_common::Error),
}

/// Run a complete upload against the shared store.
///
/// The write lock is held from the duplicate check through the single save,
/// so concurrent uploads and edits are serialized.
pub async fn run_import(
    store: &RwLock<RecordStore>,
    codec: &dyn WorkbookCodec,
    content_type: &str,
    body: &[u8],
    asset_type: AssetType,
) -> Result<ImportSummary, ImportError> {
    let file = extract_file_part(content_type, body)?;
    info!(filename = %file.filename, bytes = file.bytes.len(), asset_type = %asset_type, "Upload received");

    let rows = codec.decode_rows(&file.bytes).map_err(ImportError::Workbook)?;
    let total = rows.len();

    let outcome = {
        let mut guard = store.write().await;
        let outcome = import_rows(&mut guard, rows, asset_type, &civil_now());
        guard.save().await.map_err(ImportError::Save)?;
        outcome
    };

    info!(
        rows = total,
        inserted = outcome.inserted_count,
        duplicates = outcome.count(RejectReason::Duplicate),
        invalid = outcome.count(RejectReason::Validation),
        "Upload processed"
    );

    let report = match report::build_report(codec, &outcome.rejections, Utc::now().timestamp_millis()) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Failed to build rejection report");
            None
        }
    };
    let (error_file_base64, error_file_name) = match report {
        Some(report) => (Some(report.base64), Some(report.file_name)),
        None => (None, None),
    };

    Ok(ImportSummary {
        inserted_count: outcome.inserted_count,
        duplicate_count: outcome.count(RejectReason::Duplicate),
        validation_fail_count: outcome.count(RejectReason::Validation),
        error_file_base64,
        error_file_name,
    })
}
