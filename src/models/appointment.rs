use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::consultant::{Consultant, RawConsultant};
use super::schedule::ScheduleEntry;
use super::{NOT_UPDATED, RawId, id_of, lenient, non_empty, text_or};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Booked,
    Consulted,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 3] = [
        AppointmentStatus::Booked,
        AppointmentStatus::Consulted,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "BOOKED",
            AppointmentStatus::Consulted => "CONSULTED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ApiError::validation(format!("invalid appointment status: {}", s)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppointment {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub create_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub account_id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub account_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub consultant_id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub consultant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub meeting_link: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub checked_in: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub appointment_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub schedule_id: Option<RawId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub created_at: Option<String>,
    pub description: String,
    pub status: AppointmentStatus,
    pub account_id: Option<i64>,
    pub account_name: String,
    pub consultant_id: Option<i64>,
    pub consultant_name: String,
    pub meeting_link: Option<String>,
    pub checked_in: bool,
    pub appointment_date: Option<String>,
    pub schedule_id: Option<i64>,
}

impl Appointment {
    pub fn from_raw(raw: RawAppointment) -> Option<Appointment> {
        let id = id_of(&raw.id)?;
        let status = match raw.status.as_deref() {
            None => AppointmentStatus::Booked,
            Some(s) => s.parse().unwrap_or_else(|_| {
                warn!(appointment_id = id, status = s, "unknown appointment status, treating as booked");
                AppointmentStatus::Booked
            }),
        };
        Some(Appointment {
            id,
            created_at: raw.create_at,
            description: raw.description.unwrap_or_default(),
            status,
            account_id: id_of(&raw.account_id),
            account_name: text_or(raw.account_name, NOT_UPDATED),
            consultant_id: id_of(&raw.consultant_id),
            consultant_name: text_or(raw.consultant_name, NOT_UPDATED),
            meeting_link: non_empty(raw.meeting_link),
            checked_in: raw.checked_in.unwrap_or(false),
            appointment_date: raw.appointment_date,
            schedule_id: id_of(&raw.schedule_id),
        })
    }
}

/// A member's appointment joined with the schedule entry it claims and the
/// consultant running it.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberAppointment {
    pub appointment: Appointment,
    pub schedule: Option<ScheduleEntry>,
    pub consultant: Option<Consultant>,
}

pub fn enrich_member_appointments(
    appointments: Vec<Appointment>,
    schedules: &[ScheduleEntry],
    consultants: &[RawConsultant],
) -> Vec<MemberAppointment> {
    appointments
        .into_iter()
        .map(|appointment| {
            let schedule = appointment
                .schedule_id
                .and_then(|id| schedules.iter().find(|s| s.id == id))
                .cloned();
            if schedule.is_none() {
                warn!(
                    appointment_id = appointment.id,
                    schedule_id = ?appointment.schedule_id,
                    "no schedule found for appointment"
                );
            }
            let consultant = appointment.consultant_id.and_then(|id| {
                consultants
                    .iter()
                    .find(|c| id_of(&c.id) == Some(id))
                    .map(|c| Consultant::merge(c, c.account.as_ref()))
            });
            MemberAppointment {
                appointment,
                schedule,
                consultant,
            }
        })
        .collect()
}

/// Unvalidated booking input, as typed by a user or taken off a selected
/// schedule entry.
#[derive(Debug, Clone, Default)]
pub struct AppointmentDraft {
    pub slot_id: Option<String>,
    pub schedule_id: Option<String>,
    pub consultant_id: Option<String>,
    pub description: Option<String>,
    pub appointment_date: Option<String>,
}

impl AppointmentDraft {
    pub fn for_entry(entry: &ScheduleEntry, consultant_id: &str, description: Option<String>) -> Self {
        AppointmentDraft {
            slot_id: entry.slot_id.map(|id| id.to_string()),
            schedule_id: Some(entry.id.to_string()),
            consultant_id: Some(consultant_id.to_string()),
            description,
            appointment_date: Some(entry.date_key()),
        }
    }

    pub fn validate(self) -> Result<NewAppointment, ApiError> {
        let slot_id = required(self.slot_id.as_deref(), "slotId")?;
        let schedule_id = required(self.schedule_id.as_deref(), "scheduleId")?;
        let consultant_id = required(self.consultant_id.as_deref(), "consultantId")?;
        let appointment_date = required(self.appointment_date.as_deref(), "appointmentDate")?;
        Ok(NewAppointment {
            slot_id: positive_id(slot_id, "slot id")?,
            schedule_id: positive_id(schedule_id, "schedule id")?,
            consultant_id: positive_id(consultant_id, "consultant id")?,
            description: self.description.unwrap_or_default(),
            appointment_date: appointment_date.to_string(),
        })
    }
}

/// Body of `POST appointment`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub slot_id: i64,
    pub schedule_id: i64,
    pub consultant_id: i64,
    pub description: String,
    pub appointment_date: String,
}

/// Body of `PUT appointments/{id}`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        self == &AppointmentChanges::default()
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!("missing required field: {}", field))),
    }
}

/// Parses a strictly positive integer id.
pub fn positive_id(value: &str, what: &str) -> Result<i64, ApiError> {
    match value.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation(format!("invalid {}: {}", what, value))),
    }
}
