//! Pagination utilities
//!
//! Pages are 1-indexed. Unlike a clamped paginator, an out-of-range page
//! (including zero or a negative page) yields an empty slice rather than the
//! nearest valid page.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Page request as sent by the web client
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    /// Page number (1-indexed); absent means page 1
    #[serde(deserialize_with = "deserialize_number")]
    pub page: Option<i64>,
    /// Rows per page; absent or non-positive means "everything on one page"
    #[serde(deserialize_with = "deserialize_number")]
    pub page_per_page: Option<i64>,
}

/// Numbers, numeric strings (`"2"`, `" 10 "`) and `true` are accepted; the
/// fraction is dropped. Anything else reads as absent.
fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64),
        Value::Bool(true) => Some(1),
        _ => None,
    };
    Ok(number)
}

/// Resolved pagination metadata for a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page number (1-indexed), echoed as requested
    pub page: i64,
    /// Page size actually applied
    pub page_per_page: usize,
    /// Filtered result count before slicing
    pub total_count: usize,
}

impl Pagination {
    /// Resolve a request against the total result count.
    ///
    /// # Examples
    /// ```
    /// use ipbook_was::pagination::{PageRequest, Pagination};
    ///
    /// let p = Pagination::resolve(25, PageRequest { page: Some(3), page_per_page: Some(10) });
    /// assert_eq!(p.range(), 20..25);
    ///
    /// // No page size: one page holding everything
    /// let p = Pagination::resolve(25, PageRequest::default());
    /// assert_eq!(p.page_per_page, 25);
    /// ```
    pub fn resolve(total_count: usize, request: PageRequest) -> Self {
        let page = request.page.unwrap_or(1);
        let page_per_page = request
            .page_per_page
            .filter(|s| *s > 0)
            .and_then(|s| usize::try_from(s).ok())
            .unwrap_or_else(|| total_count.max(1));

        Self {
            page,
            page_per_page,
            total_count,
        }
    }

    /// Index range `[(page-1)*size, page*size)` intersected with the result set
    pub fn range(&self) -> std::ops::Range<usize> {
        let Ok(index) = usize::try_from(self.page.saturating_sub(1)) else {
            return 0..0;
        };
        let start = index.saturating_mul(self.page_per_page);
        let end = start.saturating_add(self.page_per_page);
        start.min(self.total_count)..end.min(self.total_count)
    }
}
