//! Prefixed ID generation and timestamp formatting.
//!
//! Every entity carries a `{prefix}-{uuid-v7}` ID. UUID v7 is time-ordered,
//! so ids sort by creation time and are never reused across restarts.

use uuid::Uuid;

/// Generate a prefixed UUID v7 ID, e.g. `batch-0192d1f4-...`.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

/// Current UTC timestamp as an ISO 8601 string (second precision).
#[must_use]
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Current UTC date as `YYYY-MM-DD`, the analytics rollup key.
#[must_use]
pub fn today_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
