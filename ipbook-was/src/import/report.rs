//! Rejection report: rejected rows with their reason, as a base64 workbook

use base64::{engine::general_purpose, Engine as _};
use ipbook_common::Result;
use serde_json::Value;

use super::pipeline::Rejection;
use super::workbook::{SheetRow, WorkbookCodec};

/// Sheet name of the report workbook
pub const REPORT_SHEET: &str = "errors";

/// Column holding the rejection reason
pub const REASON_COLUMN: &str = "reason";

/// Encoded rejection report ready for the upload response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReport {
    pub file_name: String,
    pub base64: String,
}

/// Report file name for a given creation instant
pub fn report_file_name(epoch_millis: i64) -> String {
    format!("upload_error_{epoch_millis}.xlsx")
}

/// Encode `rejections` as a workbook. `None` when there is nothing to report.
pub fn build_report(
    codec: &dyn WorkbookCodec,
    rejections: &[Rejection],
    epoch_millis: i64,
) -> Result<Option<RejectionReport>> {
    if rejections.is_empty() {
        return Ok(None);
    }

    let rows: Vec<SheetRow> = rejections
        .iter()
        .map(|rejection| {
            let mut row = rejection.row.clone();
            row.insert(
                REASON_COLUMN.to_string(),
                Value::String(rejection.reason.message().to_string()),
            );
            row
        })
        .collect();

    let bytes = codec.encode_rows(REPORT_SHEET, &rows)?;

    Ok(Some(RejectionReport {
        file_name: report_file_name(epoch_millis),
        base64: general_purpose::STANDARD.encode(bytes),
    }))
}
