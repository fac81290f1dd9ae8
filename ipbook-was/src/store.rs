//! Record store
//!
//! Owns the canonical in-memory table and its flat JSON backing file. The whole
//! table is rewritten on every mutation; this is only acceptable because the
//! dataset is small (an append-only log or embedded database would replace it
//! at scale without changing the query/update contract).
//!
//! The store itself does no locking. [`AppState`](crate::AppState) wraps it in a
//! `RwLock` and every read-modify-write sequence holds the write guard.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ipbook_common::{Error, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::normalizer::normalize;
use crate::record::{new_record_id, CanonicalRecord};

/// Bulk-import duplicate key: `ipAddress||netCategory`, both trimmed.
///
/// Not the same tuple as the composite update key (dept code, device name,
/// IP address) used by [`RecordStore::find_index_by_key`].
pub fn duplicate_key(ip_address: &str, net_category: &str) -> String {
    format!("{}||{}", ip_address.trim(), net_category.trim())
}

/// In-memory table of canonical records backed by a JSON array file
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    rows: Vec<CanonicalRecord>,
}

impl RecordStore {
    /// Create an empty store bound to `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
        }
    }

    /// Create a store with an initial table (not persisted until the next save)
    pub fn with_rows(path: impl Into<PathBuf>, rows: Vec<CanonicalRecord>) -> Self {
        Self {
            path: path.into(),
            rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current table, most-recent-first by caller convention
    pub fn rows(&self) -> &[CanonicalRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replace the table with the normalized contents of the backing file.
    ///
    /// A missing file yields an empty table. Malformed or non-array content
    /// also empties the table, and the error is returned for the caller to
    /// report.
    pub async fn load(&mut self) -> Result<usize> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Backing file not found, starting empty");
                self.rows.clear();
                return Ok(0);
            }
            Err(e) => {
                self.rows.clear();
                return Err(e.into());
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.rows.clear();
                return Err(e.into());
            }
        };

        let Value::Array(items) = parsed else {
            self.rows.clear();
            return Err(Error::InvalidInput(format!(
                "{} does not contain a JSON array",
                self.path.display()
            )));
        };

        let total = items.len();
        self.rows = items.iter().filter_map(normalize).collect();

        let mut taken = HashSet::with_capacity(self.rows.len());
        let mut reassigned = 0usize;
        for record in &mut self.rows {
            if !taken.insert(record.id.clone()) {
                record.id = new_record_id();
                taken.insert(record.id.clone());
                reassigned += 1;
            }
        }
        if reassigned > 0 {
            warn!(reassigned, "Reassigned duplicate record ids in backing file");
        }

        if self.rows.len() < total {
            warn!(
                dropped = total - self.rows.len(),
                "Skipped non-object entries in backing file"
            );
        }
        info!(rows = self.rows.len(), path = %self.path.display(), "Loaded records (normalized)");

        Ok(self.rows.len())
    }

    /// Rewrite the backing file with the whole table, pretty-printed.
    ///
    /// Writes a sibling temporary file and renames it into place so a failed
    /// write never leaves a truncated file. Failures propagate; the in-memory
    /// table is left as is.
    pub async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.rows)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        info!(rows = self.rows.len(), "Saved records");
        Ok(())
    }

    /// Whether any stored record carries `id`
    pub fn contains_id(&self, id: &str) -> bool {
        self.rows.iter().any(|r| r.id == id)
    }

    /// Prepend a record without persisting (bulk import saves once at the end).
    ///
    /// Ids stay unique: a record whose id is already stored gets a fresh one.
    pub fn push_front(&mut self, mut record: CanonicalRecord) -> &CanonicalRecord {
        if self.contains_id(&record.id) {
            let fresh = new_record_id();
            debug!(taken = %record.id, id = %fresh, "Record id already stored, reassigned");
            record.id = fresh;
        }
        self.rows.insert(0, record);
        &self.rows[0]
    }

    /// Prepend a record, then save. Returns the record as stored.
    pub async fn insert_front(&mut self, record: CanonicalRecord) -> Result<CanonicalRecord> {
        let stored = self.push_front(record).clone();
        self.save().await?;
        Ok(stored)
    }

    /// Locate a record by its composite key (exact string equality on all three)
    pub fn find_index_by_key(&self, dept_cd: &str, device_name: &str, ip_address: &str) -> Option<usize> {
        self.rows.iter().position(|r| {
            r.dept_code() == dept_cd && r.device_name == device_name && r.ip_address == ip_address
        })
    }

    /// Overwrite the record at `index`, then save
    pub async fn replace_at(&mut self, index: usize, record: CanonicalRecord) -> Result<()> {
        let slot = self
            .rows
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("No record at index {}", index)))?;
        *slot = record;
        debug!(index, "Replaced record");
        self.save().await
    }

    /// Duplicate keys of every stored record
    pub fn duplicate_keys(&self) -> HashSet<String> {
        self.rows
            .iter()
            .map(|r| duplicate_key(&r.ip_address, &r.net_category))
            .collect()
    }
}
