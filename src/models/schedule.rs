use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::slot::{RawSlot, window_label};
use super::time::normalize_time;
use super::{RawId, id_of, lenient};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchedule {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default)]
    pub recurrence: Option<Value>,
    #[serde(default)]
    pub booked_status: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub slot_id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub consultant_id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub slot: Option<RawSlot>,
}

/// One consultant's availability on one date for one slot.
///
/// `booked` is already decoded: the backend reports `bookedStatus == 0` for a
/// claimed entry and anything else for a free one. Only [`ScheduleEntry::from_raw`]
/// looks at the raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub recurrence: Option<String>,
    pub booked: bool,
    pub slot_id: Option<i64>,
    pub consultant_id: Option<String>,
    pub slot_start: Option<NaiveTime>,
    pub slot_end: Option<NaiveTime>,
}

impl ScheduleEntry {
    pub fn from_raw(raw: RawSchedule) -> Result<Self, String> {
        let id = id_of(&raw.id).ok_or_else(|| "missing schedule id".to_string())?;
        let date = raw
            .date
            .as_deref()
            .and_then(parse_schedule_date)
            .ok_or_else(|| format!("schedule {} has no usable date", id))?;
        let (slot_start, slot_end) = match &raw.slot {
            Some(slot) => (
                normalize_time(slot.slot_start.as_ref()),
                normalize_time(slot.slot_end.as_ref()),
            ),
            None => (None, None),
        };
        Ok(ScheduleEntry {
            id,
            date,
            recurrence: raw.recurrence.as_ref().and_then(recurrence_text),
            booked: booked_from_raw(raw.booked_status.as_ref()),
            slot_id: id_of(&raw.slot_id),
            consultant_id: raw.consultant_id.as_ref().and_then(RawId::normalized),
            slot_start,
            slot_end,
        })
    }

    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn slot_label(&self) -> String {
        window_label(self.slot_start, self.slot_end)
    }
}

/// `0` is the backend's "booked" marker. Everything else, absent included,
/// is free.
pub fn booked_from_raw(status: Option<&Value>) -> bool {
    match status {
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Accepts a plain calendar date or the date part of an ISO timestamp.
pub fn parse_schedule_date(text: &str) -> Option<NaiveDate> {
    let day = text.trim().split('T').next()?;
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

fn recurrence_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Decodes a schedule list record by record. Records that cannot be used are
/// logged and skipped so one bad row never hides a consultant's whole list.
pub fn ingest_schedules(records: Vec<Value>) -> Vec<ScheduleEntry> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let raw = match serde_json::from_value::<RawSchedule>(record) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(index, error = %err, "skipping undecodable schedule record");
                    return None;
                }
            };
            match ScheduleEntry::from_raw(raw) {
                Ok(entry) => {
                    if entry.slot_start.is_none() {
                        warn!(schedule_id = entry.id, "schedule has no slot start time");
                    }
                    Some(entry)
                }
                Err(reason) => {
                    warn!(index, %reason, "skipping schedule record");
                    None
                }
            }
        })
        .collect()
}

/// Body of `POST slot/register`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRegistration {
    pub date: String,
    pub consultant_id: i64,
    pub slot_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> ScheduleEntry {
        ScheduleEntry::from_raw(serde_json::from_value(value).unwrap()).unwrap()
    }

    #[test]
    fn zero_status_means_booked() {
        assert!(booked_from_raw(Some(&json!(0))));
        assert!(!booked_from_raw(Some(&json!(1))));
        assert!(!booked_from_raw(Some(&json!(2))));
        assert!(!booked_from_raw(Some(&json!("0"))));
        assert!(!booked_from_raw(Some(&json!(false))));
        assert!(!booked_from_raw(Some(&Value::Null)));
        assert!(!booked_from_raw(None));
    }

    #[test]
    fn from_raw_normalizes_fields() {
        let e = entry(json!({
            "id": 11,
            "date": "2024-01-01",
            "recurrence": "NONE",
            "bookedStatus": 0,
            "slotId": 7,
            "consultantId": "5",
            "slot": {"slotStart": "09:30:00", "slotEnd": {"hour": 10, "minute": 30}}
        }));
        assert_eq!(e.id, 11);
        assert_eq!(e.date_key(), "2024-01-01");
        assert!(e.booked);
        assert_eq!(e.slot_id, Some(7));
        assert_eq!(e.consultant_id.as_deref(), Some("5"));
        assert_eq!(e.slot_label(), "09:30 - 10:30");
        assert_eq!(e.recurrence.as_deref(), Some("NONE"));
    }

    #[test]
    fn missing_or_broken_slot_is_tolerated() {
        let e = entry(json!({"id": 1, "date": "2024-01-01", "bookedStatus": 1}));
        assert_eq!(e.slot_start, None);
        assert!(!e.booked);

        let e = entry(json!({"id": 2, "date": "2024-01-01", "slot": "broken"}));
        assert_eq!(e.slot_start, None);
        assert_eq!(e.slot_label(), "N/A");
    }

    #[test]
    fn array_start_time_is_not_bookable_today() {
        let entries = ingest_schedules(vec![json!({
            "id": 1,
            "date": "2024-01-01",
            "bookedStatus": 1,
            "slot": {"slotStart": [23, 59], "slotEnd": "23:59:00"}
        })]);
        assert_eq!(entries[0].slot_start, None);
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert!(!crate::service::availability::is_bookable(&entries[0], now));
    }

    #[test]
    fn ingest_skips_unusable_records() {
        let entries = ingest_schedules(vec![
            json!({"id": 1, "date": "2024-01-02", "bookedStatus": 1}),
            json!("not an object"),
            json!({"date": "2024-01-02"}),
            json!({"id": 4, "date": "02/01/2024"}),
            json!({"id": 5, "date": "2024-01-03T00:00:00", "bookedStatus": 0}),
        ]);
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(entries[1].date_key(), "2024-01-03");
    }

    #[test]
    fn registration_body_uses_wire_names() {
        let body = ScheduleRegistration {
            date: "2024-03-01".to_string(),
            consultant_id: 5,
            slot_ids: vec![1, 2],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"date": "2024-03-01", "consultantId": 5, "slotIds": [1, 2]})
        );
    }
}
