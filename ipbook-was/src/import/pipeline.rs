//! Per-row import processing
//!
//! Each row is validated, its flag fields normalized, checked for duplicates
//! against the store and earlier rows of the same batch, then normalized and
//! prepended. Rejected rows never abort the batch.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::workbook::SheetRow;
use crate::normalizer::normalize_at;
use crate::record::{AssetType, YN_FIELDS};
use crate::store::{duplicate_key, RecordStore};

/// Fields every imported row must carry (after trimming)
pub const REQUIRED_FIELDS: &[&str] = &["ipAddress", "deviceName", "deptCd"];

/// Why a row was not imported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A required field is blank
    Validation,
    /// Same `ipAddress` + `netCategory` already stored or earlier in the batch
    Duplicate,
}

impl RejectReason {
    /// Text written to the report's reason column
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::Validation => "필수 누락: deptCd / deviceName / ipAddress",
            RejectReason::Duplicate => "중복: IP + 망속성(netCategory)",
        }
    }
}

/// A rejected row as it stood when rejected
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub row: SheetRow,
    pub reason: RejectReason,
}

/// Result of processing one batch
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub inserted_count: usize,
    pub rejections: Vec<Rejection>,
}

impl ImportOutcome {
    pub fn count(&self, reason: RejectReason) -> usize {
        self.rejections.iter().filter(|r| r.reason == reason).count()
    }
}

/// Upload response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub inserted_count: usize,
    pub duplicate_count: usize,
    pub validation_fail_count: usize,
    pub error_file_base64: Option<String>,
    pub error_file_name: Option<String>,
}

/// Normalize a yes/no token. `None` leaves the value unchanged.
pub fn to_yn(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "o" => Some("Y"),
        "n" | "no" | "false" | "x" => Some("N"),
        _ => None,
    }
}

fn trimmed_text(row: &SheetRow, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn normalize_flags(row: &mut SheetRow) {
    for field in YN_FIELDS {
        if let Some(Value::String(current)) = row.get_mut(*field) {
            if let Some(yn) = to_yn(current) {
                *current = yn.to_string();
            }
        }
    }
}

/// Process a batch of decoded rows against `store`, forcing `asset_type`.
///
/// Accepted rows are prepended in input order (so the last accepted row ends
/// up first). The store is not saved here; the caller persists once.
pub fn import_rows(
    store: &mut RecordStore,
    rows: Vec<SheetRow>,
    asset_type: AssetType,
    now: &str,
) -> ImportOutcome {
    let mut seen: HashSet<String> = store.duplicate_keys();
    let mut outcome = ImportOutcome::default();

    for mut row in rows {
        row.insert("assetType".into(), Value::String(asset_type.label().to_string()));

        if REQUIRED_FIELDS.iter().any(|f| trimmed_text(&row, f).is_empty()) {
            outcome.rejections.push(Rejection {
                row,
                reason: RejectReason::Validation,
            });
            continue;
        }

        normalize_flags(&mut row);
        row.insert("createDt".into(), Value::String(now.to_string()));
        row.insert("updateDt".into(), Value::String(now.to_string()));

        let key = duplicate_key(&trimmed_text(&row, "ipAddress"), &trimmed_text(&row, "netCategory"));
        if seen.contains(&key) {
            debug!(key = %key, "Duplicate row rejected");
            outcome.rejections.push(Rejection {
                row,
                reason: RejectReason::Duplicate,
            });
            continue;
        }

        if let Some(record) = normalize_at(&Value::Object(row), now) {
            store.push_front(record);
            seen.insert(key);
            outcome.inserted_count += 1;
        }
    }

    outcome
}
