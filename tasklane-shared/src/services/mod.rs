/// Access-controlled mutators and queries
///
/// Each operation takes the store, the authenticated principal's user id and
/// a deserialized input. Operations validate their input, consult the
/// [`AuthorizationGuard`](crate::access::guard::AuthorizationGuard), and only
/// then touch storage.
///
/// # Modules
///
/// - [`workspaces`]: workspace creation and membership management
/// - [`projects`]: project CRUD
/// - [`sections`]: section listing and creation
/// - [`tasks`]: task CRUD, including the default-container bootstrap
/// - [`task_items`]: subtasks, comments, attachments and tags
/// - [`views`]: response shapes assembled from related records
///
/// # Patch inputs
///
/// Update inputs tell an absent field apart from an explicit `null`. Fields
/// declared `Option<Option<T>>` with [`double_option`] deserialize to `None`
/// when absent, `Some(None)` for `null` and `Some(Some(v))` otherwise.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{ServiceError, ServiceResult};

pub mod projects;
pub mod sections;
pub mod task_items;
pub mod tasks;
pub mod views;
pub mod workspaces;

/// Use with `#[serde(default, deserialize_with = "double_option")]`
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trimmed value, or `None` if blank
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Required non-blank text field
pub(crate) fn required(value: Option<String>, message: &str) -> ServiceResult<String> {
    non_blank(value).ok_or_else(|| ServiceError::validation(message))
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_due_date(value: &str) -> ServiceResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ServiceError::validation(format!("Invalid date: {}", value)))
}
