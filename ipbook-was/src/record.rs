//! Canonical record model
//!
//! Every row held by the [`RecordStore`](crate::store::RecordStore) has this
//! shape. JSON keys are camelCase to match the backing file and the web UI.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical label for network assets
pub const NETWORK_LABEL: &str = "네트워크";

/// Canonical label for server assets
pub const SERVER_LABEL: &str = "서버";

/// Division assigned to legacy rows that carry none
pub const DEFAULT_DIVISION: &str = "네트워크부문";

/// Provenance sentinel for rows without an explicit `source`
pub const DEFAULT_SOURCE: &str = "TODAY";

/// Asset type as exposed to API clients (`network` / `server`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Network,
    Server,
}

impl AssetType {
    /// Internal label stored on records
    pub fn label(self) -> &'static str {
        match self {
            AssetType::Network => NETWORK_LABEL,
            AssetType::Server => SERVER_LABEL,
        }
    }

    /// Map the external filter enumeration to an asset type
    pub fn from_filter(value: &str) -> Option<Self> {
        match value {
            "network" => Some(AssetType::Network),
            "server" => Some(AssetType::Server),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Network => write!(f, "network"),
            AssetType::Server => write!(f, "server"),
        }
    }
}

/// Fresh record id (v4 UUID)
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Canonicalize a raw asset-type token.
///
/// Known synonyms map to the single network or server label; blank input maps
/// to the network label; anything else passes through trimmed.
pub fn canonical_asset_label(raw: &str) -> String {
    match raw.trim() {
        "" | "NETWORK" | "network" | NETWORK_LABEL => NETWORK_LABEL.to_string(),
        "SERVER" | "server" | SERVER_LABEL => SERVER_LABEL.to_string(),
        other => other.to_string(),
    }
}

/// Keys owned by [`CanonicalRecord`] fields. Anything else lands in `extra`.
pub const CANONICAL_KEYS: &[&str] = &[
    "id",
    "baseDt",
    "ipAddress",
    "netCategory",
    "netType",
    "assetType",
    "deviceId",
    "deviceName",
    "deviceType",
    "bumunNm",
    "bumunCd",
    "officeNm",
    "officeCd",
    "bonbuNm",
    "bonbuCd",
    "centerNm",
    "centerCd",
    "deptNm",
    "deptCd",
    "externalNetYn",
    "privacyInfoYn",
    "tacsYn",
    "accntMgmtYn",
    "vaccineYn",
    "webshellYn",
    "udagentYn",
    "smpagentYn",
    "ipType1",
    "ipType2",
    "ipType3",
    "representYn",
    "osType",
    "osVersion",
    "dbType",
    "dbVersion",
    "hostId",
    "hostName",
    "instLocation",
    "erpBarcode",
    "svcType",
    "createDt",
    "createUser",
    "updateDt",
    "updateUser",
    "comment",
    "fromAuto",
    "fromManual",
    "conflicted",
    "source",
];

/// Yes/No flag fields rewritten to `Y`/`N` during bulk import
pub const YN_FIELDS: &[&str] = &[
    "externalNetYn",
    "privacyInfoYn",
    "tacsYn",
    "accntMgmtYn",
    "vaccineYn",
    "webshellYn",
    "udagentYn",
    "smpagentYn",
    "representYn",
];

/// A normalized inventory row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: String,
    pub base_dt: String,

    // Network identity
    pub ip_address: String,
    pub net_category: String,
    pub net_type: String,
    pub asset_type: String,

    // Device
    pub device_id: String,
    pub device_name: String,
    pub device_type: String,

    // Organization
    pub bumun_nm: String,
    pub bumun_cd: Option<String>,
    pub office_nm: String,
    pub office_cd: Option<String>,
    pub bonbu_nm: String,
    pub bonbu_cd: Option<String>,
    pub center_nm: String,
    pub center_cd: Option<String>,
    pub dept_nm: String,
    pub dept_cd: Option<String>,

    // Yes/No flags
    pub external_net_yn: Option<String>,
    pub privacy_info_yn: Option<String>,
    pub tacs_yn: Option<String>,
    pub accnt_mgmt_yn: Option<String>,
    pub vaccine_yn: Option<String>,
    pub webshell_yn: Option<String>,
    pub udagent_yn: Option<String>,
    pub smpagent_yn: Option<String>,

    // IP sub-typing
    pub ip_type1: Option<String>,
    pub ip_type2: Option<String>,
    pub ip_type3: Option<String>,
    pub represent_yn: Option<String>,

    // OS / DB
    pub os_type: Option<String>,
    pub os_version: Option<String>,
    pub db_type: Option<String>,
    pub db_version: Option<String>,

    pub host_id: Option<String>,
    pub host_name: Option<String>,
    pub inst_location: Option<String>,
    pub erp_barcode: Option<String>,
    pub svc_type: Option<String>,

    // Audit
    pub create_dt: Option<String>,
    pub create_user: Option<String>,
    pub update_dt: Option<String>,
    pub update_user: Option<String>,

    pub comment: Option<String>,
    pub from_auto: Option<Value>,
    pub from_manual: Option<Value>,
    pub conflicted: Option<Value>,
    pub source: String,

    /// Unrecognized keys carried through from canonical-shape input
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalRecord {
    /// String view of a field by its JSON key. Absent values read as `None`.
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "id" => &self.id,
            "baseDt" => &self.base_dt,
            "ipAddress" => &self.ip_address,
            "netCategory" => &self.net_category,
            "netType" => &self.net_type,
            "assetType" => &self.asset_type,
            "deviceId" => &self.device_id,
            "deviceName" => &self.device_name,
            "deviceType" => &self.device_type,
            "bumunNm" => &self.bumun_nm,
            "officeNm" => &self.office_nm,
            "bonbuNm" => &self.bonbu_nm,
            "centerNm" => &self.center_nm,
            "deptNm" => &self.dept_nm,
            "source" => &self.source,
            _ => return self.optional_field(key),
        };
        Some(value.as_str())
    }

    fn optional_field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "bumunCd" => &self.bumun_cd,
            "officeCd" => &self.office_cd,
            "bonbuCd" => &self.bonbu_cd,
            "centerCd" => &self.center_cd,
            "deptCd" => &self.dept_cd,
            "externalNetYn" => &self.external_net_yn,
            "privacyInfoYn" => &self.privacy_info_yn,
            "tacsYn" => &self.tacs_yn,
            "accntMgmtYn" => &self.accnt_mgmt_yn,
            "vaccineYn" => &self.vaccine_yn,
            "webshellYn" => &self.webshell_yn,
            "udagentYn" => &self.udagent_yn,
            "smpagentYn" => &self.smpagent_yn,
            "ipType1" => &self.ip_type1,
            "ipType2" => &self.ip_type2,
            "ipType3" => &self.ip_type3,
            "representYn" => &self.represent_yn,
            "osType" => &self.os_type,
            "osVersion" => &self.os_version,
            "dbType" => &self.db_type,
            "dbVersion" => &self.db_version,
            "hostId" => &self.host_id,
            "hostName" => &self.host_name,
            "instLocation" => &self.inst_location,
            "erpBarcode" => &self.erp_barcode,
            "svcType" => &self.svc_type,
            "createDt" => &self.create_dt,
            "createUser" => &self.create_user,
            "updateDt" => &self.update_dt,
            "updateUser" => &self.update_user,
            "comment" => &self.comment,
            _ => return self.extra.get(key).and_then(Value::as_str),
        };
        value.as_deref()
    }

    /// Field value with absent treated as the empty string
    pub fn text(&self, key: &str) -> &str {
        self.field(key).unwrap_or("")
    }

    /// Department code, empty when absent
    pub fn dept_code(&self) -> &str {
        self.dept_cd.as_deref().unwrap_or("")
    }

    /// Sort key for "most recent first": update time, else create time
    pub fn recency_key(&self) -> &str {
        self.update_dt
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.create_dt.as_deref())
            .unwrap_or("")
    }

    /// Serialize into a JSON object (used for merge-on-update)
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
