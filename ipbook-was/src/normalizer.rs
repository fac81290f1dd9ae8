//! Schema normalizer
//!
//! Converts raw JSON objects of either schema generation into a
//! [`CanonicalRecord`]. The schema is classified once into a [`RawRecord`] and
//! each variant has its own conversion path.
//!
//! Normalization is idempotent: feeding a normalized record back in (as JSON)
//! yields the same record.

use ipbook_common::time::{civil_from_epoch_millis, civil_now, normalize_civil};
use serde_json::{Map, Value};

use crate::record::{
    canonical_asset_label, new_record_id, CanonicalRecord, CANONICAL_KEYS, DEFAULT_DIVISION,
    DEFAULT_SOURCE, NETWORK_LABEL,
};

/// Keys whose presence marks an object as canonical-shape
const CANONICAL_MARKERS: &[&str] = &["ipAddress", "netCategory", "netType"];

/// Legacy timestamp aliases folded into `createDt` / `updateDt`
const LEGACY_TIME_KEYS: &[&str] = &["createdAt", "updatedAt"];

/// Schema generation of a raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    Legacy,
    Canonical,
}

/// A raw object tagged with its schema generation
#[derive(Debug, Clone, Copy)]
pub enum RawRecord<'a> {
    Legacy(&'a Map<String, Value>),
    Canonical(&'a Map<String, Value>),
}

impl<'a> RawRecord<'a> {
    /// Classify a raw JSON value. Non-objects yield `None`.
    pub fn classify(raw: &'a Value) -> Option<Self> {
        let map = raw.as_object()?;
        if CANONICAL_MARKERS.iter().any(|key| map.contains_key(*key)) {
            Some(RawRecord::Canonical(map))
        } else {
            Some(RawRecord::Legacy(map))
        }
    }

    pub fn schema(&self) -> SchemaVersion {
        match self {
            RawRecord::Legacy(_) => SchemaVersion::Legacy,
            RawRecord::Canonical(_) => SchemaVersion::Canonical,
        }
    }
}

/// Normalize a raw record using the current civil time for legacy defaults
pub fn normalize(raw: &Value) -> Option<CanonicalRecord> {
    normalize_at(raw, &civil_now())
}

/// Normalize a raw record; `now` is the civil timestamp used where a legacy
/// record carries no creation time.
pub fn normalize_at(raw: &Value, now: &str) -> Option<CanonicalRecord> {
    match RawRecord::classify(raw)? {
        RawRecord::Canonical(map) => Some(from_canonical(map)),
        RawRecord::Legacy(map) => Some(from_legacy(map, now)),
    }
}

fn from_canonical(map: &Map<String, Value>) -> CanonicalRecord {
    let created = first_truthy_time(map, &["createDt", "createdAt"]);
    let updated = first_truthy_time(map, &["updateDt", "updatedAt", "createDt", "createdAt"])
        .or_else(|| created.clone());

    let extra = map
        .iter()
        .filter(|(key, _)| {
            !CANONICAL_KEYS.contains(&key.as_str()) && !LEGACY_TIME_KEYS.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    CanonicalRecord {
        id: id_or_new(map.get("id")),
        base_dt: map.get("baseDt").and_then(time_text).unwrap_or_default(),
        ip_address: string(map, "ipAddress"),
        net_category: string(map, "netCategory"),
        net_type: string(map, "netType"),
        asset_type: canonical_asset_label(&string(map, "assetType")),
        device_id: string(map, "deviceId"),
        device_name: string(map, "deviceName"),
        device_type: string(map, "deviceType"),
        bumun_nm: string(map, "bumunNm"),
        bumun_cd: text(map, "bumunCd"),
        office_nm: string(map, "officeNm"),
        office_cd: text(map, "officeCd"),
        bonbu_nm: string(map, "bonbuNm"),
        bonbu_cd: text(map, "bonbuCd"),
        center_nm: string(map, "centerNm"),
        center_cd: text(map, "centerCd"),
        dept_nm: string(map, "deptNm"),
        dept_cd: text(map, "deptCd"),
        external_net_yn: text(map, "externalNetYn"),
        privacy_info_yn: text(map, "privacyInfoYn"),
        tacs_yn: text(map, "tacsYn"),
        accnt_mgmt_yn: text(map, "accntMgmtYn"),
        vaccine_yn: text(map, "vaccineYn"),
        webshell_yn: text(map, "webshellYn"),
        udagent_yn: text(map, "udagentYn"),
        smpagent_yn: text(map, "smpagentYn"),
        ip_type1: text(map, "ipType1"),
        ip_type2: text(map, "ipType2"),
        ip_type3: text(map, "ipType3"),
        represent_yn: text(map, "representYn"),
        os_type: text(map, "osType"),
        os_version: text(map, "osVersion"),
        db_type: text(map, "dbType"),
        db_version: text(map, "dbVersion"),
        host_id: text(map, "hostId"),
        host_name: text(map, "hostName"),
        inst_location: text(map, "instLocation"),
        erp_barcode: text(map, "erpBarcode"),
        svc_type: text(map, "svcType"),
        create_dt: created,
        create_user: text(map, "createUser"),
        update_dt: updated,
        update_user: text(map, "updateUser"),
        comment: text(map, "comment"),
        from_auto: scalar(map, "fromAuto"),
        from_manual: scalar(map, "fromManual"),
        conflicted: scalar(map, "conflicted"),
        source: first_truthy(map, &["source"]).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        extra,
    }
}

fn from_legacy(map: &Map<String, Value>, now: &str) -> CanonicalRecord {
    let created = first_truthy_time(map, &["createDt", "createdAt"])
        .unwrap_or_else(|| normalize_civil(now));
    let updated =
        first_truthy_time(map, &["updateDt", "updatedAt"]).unwrap_or_else(|| created.clone());

    CanonicalRecord {
        id: id_or_new(map.get("id")),
        base_dt: first_truthy_time(map, &["baseDt"]).unwrap_or_default(),
        ip_address: first_truthy(map, &["ip"]).unwrap_or_default(),
        net_category: first_truthy(map, &["netAttr"]).unwrap_or_default(),
        net_type: first_truthy(map, &["netType1", "netType2"]).unwrap_or_default(),
        asset_type: NETWORK_LABEL.to_string(),
        device_id: first_truthy(map, &["deviceIdNms", "deviceIdErp"]).unwrap_or_default(),
        device_name: first_truthy(map, &["deviceName"]).unwrap_or_default(),
        device_type: first_truthy(map, &["deviceType"]).unwrap_or_default(),
        bumun_nm: first_truthy(map, &["dumunNm"]).unwrap_or_else(|| DEFAULT_DIVISION.to_string()),
        bumun_cd: first_truthy(map, &["dumunCd"]),
        office_nm: first_truthy(map, &["station"]).unwrap_or_default(),
        office_cd: first_truthy(map, &["officeCd"]),
        bonbu_nm: first_truthy(map, &["hq"]).unwrap_or_default(),
        bonbu_cd: first_truthy(map, &["bonbuCd"]),
        center_nm: first_truthy(map, &["center"]).unwrap_or_default(),
        center_cd: first_truthy(map, &["centerCd"]),
        dept_nm: first_truthy(map, &["dept"]).unwrap_or_default(),
        dept_cd: first_truthy(map, &["deptCd"]),
        external_net_yn: text(map, "ktLink"),
        privacy_info_yn: text(map, "personalInfo"),
        tacs_yn: text(map, "tacs"),
        accnt_mgmt_yn: text(map, "accountSystem"),
        vaccine_yn: text(map, "vaccine"),
        webshell_yn: text(map, "webshell"),
        udagent_yn: text(map, "udAgent"),
        smpagent_yn: text(map, "smpAgent"),
        ip_type1: text(map, "ipType1"),
        ip_type2: text(map, "ipType2"),
        ip_type3: text(map, "ipType3"),
        represent_yn: text(map, "rep"),
        os_type: text(map, "osType"),
        os_version: text(map, "osVer"),
        db_type: text(map, "dbType"),
        db_version: text(map, "dbVer"),
        host_id: text(map, "hostId"),
        host_name: text(map, "hostName"),
        inst_location: text(map, "installLoc"),
        erp_barcode: text(map, "facilityBarcode"),
        svc_type: text(map, "svcType"),
        create_dt: Some(created),
        create_user: first_truthy(map, &["createUser", "createdBy"]),
        update_dt: Some(updated),
        update_user: first_truthy(map, &["updateUser", "updatedBy"]),
        comment: text(map, "comment"),
        from_auto: scalar(map, "fromAuto"),
        from_manual: scalar(map, "fromManual"),
        conflicted: scalar(map, "conflicted"),
        source: first_truthy(map, &["source"]).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        extra: Map::new(),
    }
}

/// Render a scalar JSON value as text. `null`, arrays and objects read as absent.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(value_text)
}

fn string(map: &Map<String, Value>, key: &str) -> String {
    text(map, key).unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text of the first key holding a truthy scalar (fallback chains like
/// `netType1` else `netType2`)
fn first_truthy(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter(|value| is_truthy(value))
        .find_map(value_text)
}

fn scalar(map: &Map<String, Value>, key: &str) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).cloned()
}

fn id_or_new(value: Option<&Value>) -> String {
    value
        .and_then(value_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(new_record_id)
}

/// Civil-format a timestamp value. Only integer JSON numbers are epoch
/// milliseconds; text goes through `normalize_civil`, so compact digit dates
/// such as `20240102120000` pass through unchanged.
fn time_text(value: &Value) -> Option<String> {
    if let Some(civil) = value.as_i64().and_then(civil_from_epoch_millis) {
        return Some(civil);
    }
    value_text(value).map(|text| normalize_civil(&text))
}

fn first_truthy_time(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter(|value| is_truthy(value))
        .find_map(time_text)
}
