//! Query engine: filter, sort, paginate and mask a view over the table.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::pagination::{PageRequest, Pagination};
use crate::record::{AssetType, CanonicalRecord};

/// Replacement for the last octet when IP display is off
pub const IP_MASK: &str = "***";

/// Fields searched by the keyword filter
const KEYWORD_FIELDS: &[&str] = &["ipAddress", "deviceName", "erpBarcode", "deviceId", "createUser"];

/// Filter criteria. Absent or empty fields impose no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryFilter {
    #[serde(alias = "division", deserialize_with = "deserialize_text")]
    pub bumun_nm: Option<String>,
    #[serde(alias = "bureau", deserialize_with = "deserialize_text")]
    pub bonbu_nm: Option<String>,
    #[serde(alias = "center", deserialize_with = "deserialize_text")]
    pub center_nm: Option<String>,
    #[serde(alias = "department", deserialize_with = "deserialize_text")]
    pub dept_nm: Option<String>,

    /// `network` or `server`; other values are ignored
    #[serde(deserialize_with = "deserialize_text")]
    pub asset_type: Option<String>,

    #[serde(deserialize_with = "deserialize_text")]
    pub net_category: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub net_type: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub device_type: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub ip_type1: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub ip_type2: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub ip_type3: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub os_type: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub db_type: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub base_dt: Option<String>,

    #[serde(deserialize_with = "deserialize_text")]
    pub keyword: Option<String>,

    #[serde(deserialize_with = "deserialize_flag")]
    pub show_ip: bool,

    #[serde(deserialize_with = "deserialize_text")]
    pub sort_key: Option<String>,
}

/// Criteria arrive from a loosely typed client: numbers and `true` are read as
/// their text, while `false`, `0`, `null` and structured values impose nothing.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    })
}

/// Accepts `true`, `1`, `"1"` and `"true"` as true; anything else is false
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s == "1" || s == "true",
        _ => false,
    })
}

impl QueryFilter {
    /// Exact-match criteria as (record field, wanted value) pairs
    fn exact_criteria(&self) -> Vec<(&'static str, &str)> {
        [
            ("bumunNm", &self.bumun_nm),
            ("bonbuNm", &self.bonbu_nm),
            ("centerNm", &self.center_nm),
            ("deptNm", &self.dept_nm),
            ("netCategory", &self.net_category),
            ("netType", &self.net_type),
            ("deviceType", &self.device_type),
            ("ipType1", &self.ip_type1),
            ("ipType2", &self.ip_type2),
            ("ipType3", &self.ip_type3),
            ("osType", &self.os_type),
            ("dbType", &self.db_type),
            ("baseDt", &self.base_dt),
        ]
        .into_iter()
        .filter_map(|(field, wanted)| {
            wanted
                .as_deref()
                .filter(|w| !w.is_empty())
                .map(|w| (field, w))
        })
        .collect()
    }

    pub fn sort(&self) -> SortKey {
        SortKey::parse(self.sort_key.as_deref().unwrap_or(""))
    }
}

/// Sort modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// `IP주소`: numeric octet order
    IpAddress,
    /// `망속성`: network category, ascending
    NetCategory,
    /// `망유형`: network type, ascending
    NetType,
    /// Default: most recently updated (or created) first
    #[default]
    Recent,
}

impl SortKey {
    pub fn parse(key: &str) -> Self {
        match key {
            "IP주소" => SortKey::IpAddress,
            "망속성" => SortKey::NetCategory,
            "망유형" => SortKey::NetType,
            _ => SortKey::Recent,
        }
    }

    fn compare(self, a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
        match self {
            SortKey::IpAddress => ip_tuple(&a.ip_address).cmp(&ip_tuple(&b.ip_address)),
            SortKey::NetCategory => a.net_category.cmp(&b.net_category),
            SortKey::NetType => a.net_type.cmp(&b.net_type),
            // Fixed-width civil timestamps: string order is time order
            SortKey::Recent => b.recency_key().cmp(a.recency_key()),
        }
    }
}

/// One page of results plus the pre-pagination count
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub rows: Vec<CanonicalRecord>,
    pub pagination: Pagination,
}

impl QueryResult {
    pub fn total_count(&self) -> usize {
        self.pagination.total_count
    }
}

/// Four-octet sort tuple: split on '.', non-numeric segments read as 0,
/// short addresses right-padded with zeros, extra segments dropped.
pub fn ip_tuple(ip: &str) -> [i64; 4] {
    let mut tuple = [0i64; 4];
    for (slot, segment) in tuple.iter_mut().zip(ip.split('.')) {
        *slot = leading_integer(segment);
    }
    tuple
}

/// Integer value of a segment's optionally signed leading digits (0 when
/// there are none)
fn leading_integer(segment: &str) -> i64 {
    let trimmed = segment.trim_start();
    let sign_len = usize::from(trimmed.starts_with(['-', '+']));
    let end = trimmed[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed.len(), |i| i + sign_len);
    trimmed[..end].parse().unwrap_or(0)
}

/// Mask the last octet of a four-part address; other shapes pass through.
pub fn mask_ip(ip: &str) -> String {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return ip.to_string();
    }
    format!("{}.{}.{}.{}", parts[0], parts[1], parts[2], IP_MASK)
}

/// Keyword containment across the searchable fields. Empty keyword matches all.
fn matches_keyword(record: &CanonicalRecord, keyword: &str) -> bool {
    if keyword.is_empty() {
        return true;
    }
    KEYWORD_FIELDS
        .iter()
        .filter_map(|field| record.field(field))
        .any(|value| value.contains(keyword))
}

/// Run a query over `records`. Stored records are never modified; masking is
/// applied to the returned copies only.
pub fn query(
    records: &[CanonicalRecord],
    filter: &QueryFilter,
    sort: SortKey,
    page: PageRequest,
) -> QueryResult {
    let criteria = filter.exact_criteria();
    let asset_label = filter
        .asset_type
        .as_deref()
        .and_then(AssetType::from_filter)
        .map(AssetType::label);
    let keyword = filter.keyword.as_deref().unwrap_or("").trim();

    let mut matched: Vec<&CanonicalRecord> = records
        .iter()
        .filter(|r| criteria.iter().all(|(field, wanted)| r.text(field) == *wanted))
        .filter(|r| asset_label.map_or(true, |label| r.asset_type == label))
        .filter(|r| matches_keyword(r, keyword))
        .collect();

    matched.sort_by(|a, b| sort.compare(a, b));

    let pagination = Pagination::resolve(matched.len(), page);
    let rows = matched[pagination.range()]
        .iter()
        .map(|r| {
            let mut row = (*r).clone();
            if !filter.show_ip {
                row.ip_address = mask_ip(&row.ip_address);
            }
            row
        })
        .collect();

    QueryResult { rows, pagination }
}
