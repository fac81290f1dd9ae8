//! Facet index builder
//!
//! Distinct-value lists per filterable field plus the organization tree used
//! by the web client's cascading selects.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::record::{CanonicalRecord, DEFAULT_DIVISION};

/// Placeholder bureau for records without one
pub const OTHER_BUREAU: &str = "기타본부";
/// Placeholder center for records without one
pub const OTHER_CENTER: &str = "기타센터";
/// Placeholder department for records without one
pub const OTHER_DEPARTMENT: &str = "기타부서";

/// Trimmed distinct values of `field`, in first-seen order. Empty strings and
/// the `-` placeholder are excluded.
pub fn distinct_values(records: &[CanonicalRecord], field: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.field(field))
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "-")
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Node of the organization tree. Departments are leaves and carry no
/// `children` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgNode {
    pub org_nm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<OrgNode>>,
}

impl OrgNode {
    fn branch(name: &str) -> Self {
        Self {
            org_nm: name.to_string(),
            children: Some(Vec::new()),
        }
    }

    fn leaf(name: &str) -> Self {
        Self {
            org_nm: name.to_string(),
            children: None,
        }
    }

    /// Child named `name`, appended as a branch if missing
    fn child_branch(&mut self, name: &str) -> &mut OrgNode {
        let children = self.children.get_or_insert_with(Vec::new);
        let index = match children.iter().position(|c| c.org_nm == name) {
            Some(index) => index,
            None => {
                children.push(OrgNode::branch(name));
                children.len() - 1
            }
        };
        &mut children[index]
    }

    fn add_leaf(&mut self, name: &str) {
        let children = self.children.get_or_insert_with(Vec::new);
        if !children.iter().any(|c| c.org_nm == name) {
            children.push(OrgNode::leaf(name));
        }
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

/// Fold records into a division → bureau → center → department tree.
/// Sibling order is first-seen.
pub fn build_org_tree(records: &[CanonicalRecord]) -> Vec<OrgNode> {
    let mut divisions: Vec<OrgNode> = Vec::new();

    for record in records {
        let division = or_placeholder(&record.bumun_nm, DEFAULT_DIVISION);
        let bureau = or_placeholder(&record.bonbu_nm, OTHER_BUREAU);
        let center = or_placeholder(&record.center_nm, OTHER_CENTER);
        let department = or_placeholder(&record.dept_nm, OTHER_DEPARTMENT);

        let index = match divisions.iter().position(|d| d.org_nm == division) {
            Some(index) => index,
            None => {
                divisions.push(OrgNode::branch(division));
                divisions.len() - 1
            }
        };

        divisions[index]
            .child_branch(bureau)
            .child_branch(center)
            .add_leaf(department);
    }

    divisions
}

/// Organization list: either the static snapshot verbatim or a tree built
/// from the current records
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OrgList {
    Snapshot(Value),
    Built(Vec<OrgNode>),
}

/// Response body of the filters endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub org_list: OrgList,
    pub net_category_list: Vec<String>,
    pub net_type_list: Vec<String>,
    pub device_type_list: Vec<String>,
    pub ip_type1_list: Vec<String>,
    pub ip_type2_list: Vec<String>,
    pub ip_type3_list: Vec<String>,
    pub os_type_list: Vec<String>,
    pub db_type_list: Vec<String>,
}

/// Build every facet list. A static org snapshot replaces the built tree only
/// when it is a JSON array.
pub fn facets(records: &[CanonicalRecord], static_org: Option<&Value>) -> Facets {
    let org_list = match static_org {
        Some(snapshot @ Value::Array(_)) => OrgList::Snapshot(snapshot.clone()),
        _ => OrgList::Built(build_org_tree(records)),
    };

    Facets {
        org_list,
        net_category_list: distinct_values(records, "netCategory"),
        net_type_list: distinct_values(records, "netType"),
        device_type_list: distinct_values(records, "deviceType"),
        ip_type1_list: distinct_values(records, "ipType1"),
        ip_type2_list: distinct_values(records, "ipType2"),
        ip_type3_list: distinct_values(records, "ipType3"),
        os_type_list: distinct_values(records, "osType"),
        db_type_list: distinct_values(records, "dbType"),
    }
}

/// Lazily loaded static organization snapshot.
///
/// The file is read at most once. A missing or unparsable file is logged and
/// cached as absent, so the built tree is used from then on.
#[derive(Debug)]
pub struct OrgSnapshot {
    path: PathBuf,
    cell: OnceCell<Option<Value>>,
}

impl OrgSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached snapshot value, loading it on first use
    pub async fn get(&self) -> Option<&Value> {
        self.cell
            .get_or_init(|| load_snapshot(&self.path))
            .await
            .as_ref()
    }
}

async fn load_snapshot(path: &Path) -> Option<Value> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read org snapshot");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => {
            info!(path = %path.display(), "Loaded org snapshot");
            Some(value)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to parse org snapshot");
            None
        }
    }
}
