use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::ApiError;
use crate::models::normalize_id;
use crate::models::schedule::{DATE_FORMAT, ScheduleEntry};
use crate::models::slot::Slot;

// Bookability is decided at minute precision.
fn minute_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// True when the entry starts strictly after `now`. A start time is required
/// to match an entry against today's clock; without one only later dates
/// qualify.
pub fn is_future(entry: &ScheduleEntry, now: NaiveDateTime) -> bool {
    let today = now.date();
    if entry.date > today {
        return true;
    }
    if entry.date < today {
        return false;
    }
    match entry.slot_start {
        Some(start) => minute_of(start) > minute_of(now.time()),
        None => false,
    }
}

pub fn filter_future_schedules(entries: &[ScheduleEntry], now: NaiveDateTime) -> Vec<ScheduleEntry> {
    entries
        .iter()
        .filter(|entry| is_future(entry, now))
        .cloned()
        .collect()
}

/// The only gate consulted before a selection or a submit.
pub fn is_bookable(entry: &ScheduleEntry, now: NaiveDateTime) -> bool {
    !entry.booked && is_future(entry, now)
}

/// Same rule as [`is_bookable`] but says why a selection is refused.
pub fn validate_selection(entry: &ScheduleEntry, now: NaiveDateTime) -> Result<(), ApiError> {
    if !is_future(entry, now) {
        return Err(ApiError::validation(format!(
            "cannot book a past time slot ({} {}), please choose another one",
            entry.date_key(),
            entry.slot_label()
        )));
    }
    if entry.booked {
        return Err(ApiError::conflict(format!(
            "time slot {} on {} is already booked, please choose another one",
            entry.slot_label(),
            entry.date_key()
        )));
    }
    Ok(())
}

/// Entries grouped by calendar date. Keys keep the order in which they were
/// first seen; entries keep their order within a date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateGroups {
    order: Vec<String>,
    groups: HashMap<String, Vec<ScheduleEntry>>,
}

impl DateGroups {
    pub fn dates(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, date: &str) -> Option<&[ScheduleEntry]> {
        self.groups.get(date).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Date keys in ascending calendar order.
    pub fn sorted_dates(&self) -> Vec<String> {
        let mut dates = self.order.clone();
        dates.sort_by_key(|key| sort_key(key));
        dates
    }

    pub fn into_sorted(mut self) -> Vec<(String, Vec<ScheduleEntry>)> {
        let dates = self.sorted_dates();
        dates
            .into_iter()
            .map(|date| {
                let entries = self.groups.remove(&date).unwrap_or_default();
                (date, entries)
            })
            .collect()
    }
}

// Unparseable keys sort last.
fn sort_key(key: &str) -> (NaiveDate, String) {
    let parsed = NaiveDate::parse_from_str(key, DATE_FORMAT).unwrap_or(NaiveDate::MAX);
    (parsed, key.to_string())
}

pub fn group_by_date<I>(entries: I) -> DateGroups
where
    I: IntoIterator<Item = ScheduleEntry>,
{
    let mut grouped = DateGroups::default();
    for entry in entries {
        let key = entry.date_key();
        match grouped.groups.get_mut(&key) {
            Some(bucket) => bucket.push(entry),
            None => {
                grouped.order.push(key.clone());
                grouped.groups.insert(key, vec![entry]);
            }
        }
    }
    grouped
}

/// Slot ids (as strings) already claimed for `consultant_id` on `date`.
/// Dates are compared as calendar dates, never as instants.
pub fn compute_booked_slot_ids(
    entries: &[ScheduleEntry],
    consultant_id: &str,
    date: NaiveDate,
) -> BTreeSet<String> {
    let consultant_id = normalize_id(consultant_id);
    entries
        .iter()
        .filter(|entry| entry.booked && entry.date == date)
        .filter(|entry| entry.consultant_id.as_deref() == Some(consultant_id.as_str()))
        .filter_map(|entry| entry.slot_id.map(|id| id.to_string()))
        .collect()
}

/// Bookable entries on one date, in input order.
pub fn available_on(entries: &[ScheduleEntry], date: NaiveDate, now: NaiveDateTime) -> Vec<ScheduleEntry> {
    entries
        .iter()
        .filter(|entry| entry.date == date && is_bookable(entry, now))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotAvailability {
    pub slot: Slot,
    pub booked: bool,
}

/// Staff view: the slot catalogue for one consultant and date, with the
/// slots already booked marked so they can be disabled.
pub fn day_availability(
    slots: &[Slot],
    entries: &[ScheduleEntry],
    consultant_id: &str,
    date: NaiveDate,
) -> Vec<SlotAvailability> {
    let booked = compute_booked_slot_ids(entries, consultant_id, date);
    slots
        .iter()
        .map(|slot| SlotAvailability {
            booked: booked.contains(&slot.id.to_string()),
            slot: slot.clone(),
        })
        .collect()
}
