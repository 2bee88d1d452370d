//! Shared date/timestamp helpers.
//!
//! Scored and hashed data only ever sees an explicit `as_of` date. Wall-clock
//! reads are limited to audit metadata (`now_epoch_z`) and the CLI default for
//! `--as-of`.

use crate::core::error::VerdictError;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate, VerdictError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| VerdictError::InvalidInput(format!("malformed date '{}'", input)))
}

pub fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>, VerdictError> {
    input.map(parse_date).transpose()
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
