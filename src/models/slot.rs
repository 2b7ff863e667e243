use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::time::{RawTime, format_hhmm, normalize_time};
use super::{RawId, id_of, lenient, non_empty};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSlot {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default)]
    pub slot_start: Option<RawTime>,
    #[serde(default)]
    pub slot_end: Option<RawTime>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
}

/// A named daily time window, e.g. 09:00 - 10:00. Reference data owned by
/// the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub id: i64,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub label: String,
}

impl Slot {
    pub fn from_raw(raw: RawSlot) -> Option<Slot> {
        let id = id_of(&raw.id)?;
        let start = normalize_time(raw.slot_start.as_ref());
        let end = normalize_time(raw.slot_end.as_ref());
        let label = non_empty(raw.label).unwrap_or_else(|| window_label(start, end));
        Some(Slot {
            id,
            start,
            end,
            label,
        })
    }
}

/// "09:00 - 10:00", or "N/A" when either side is unknown.
pub fn window_label(start: Option<NaiveTime>, end: Option<NaiveTime>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!("{} - {}", format_hhmm(start), format_hhmm(end)),
        _ => "N/A".to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSlot {
    #[serde(serialize_with = "serialize_clock")]
    pub slot_start: NaiveTime,
    #[serde(serialize_with = "serialize_clock")]
    pub slot_end: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn serialize_clock<S: serde::Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format("%H:%M:%S").to_string())
}
