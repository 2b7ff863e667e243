use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{info, warn};

use super::api_service::ApiService;
use super::availability::{filter_future_schedules, group_by_date, validate_selection};
use crate::error::ApiError;
use crate::models::appointment::AppointmentDraft;
use crate::models::normalize_id;
use crate::models::schedule::ScheduleEntry;

/// What a member sees for one consultant: every entry the backend returned,
/// plus the future ones grouped by date in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultantAvailability {
    pub consultant_id: String,
    pub entries: Vec<ScheduleEntry>,
    pub days: Vec<(String, Vec<ScheduleEntry>)>,
}

impl ConsultantAvailability {
    pub fn from_entries(consultant_id: &str, entries: Vec<ScheduleEntry>, now: NaiveDateTime) -> Self {
        let days = group_by_date(filter_future_schedules(&entries, now)).into_sorted();
        Self {
            consultant_id: normalize_id(consultant_id),
            entries,
            days,
        }
    }

    /// Looks through all entries, past and booked ones included, so a
    /// refused selection can say why.
    pub fn find(&self, schedule_id: i64) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|entry| entry.id == schedule_id)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub appointment: Value,
    /// Fresh schedule list after the booking; None when the re-fetch failed.
    pub availability: Option<ConsultantAvailability>,
}

pub struct BookingService<'a> {
    api: &'a ApiService,
}

impl<'a> BookingService<'a> {
    pub fn new(api: &'a ApiService) -> Self {
        Self { api }
    }

    pub async fn load_availability(
        &self,
        consultant_id: &str,
        now: NaiveDateTime,
    ) -> Result<ConsultantAvailability, ApiError> {
        let entries = self.api.get_consultant_schedules(consultant_id).await?;
        Ok(ConsultantAvailability::from_entries(consultant_id, entries, now))
    }

    /// Books `schedule_id` out of an availability the caller already loaded.
    /// The local check can be stale; a backend refusal comes back as the
    /// error it maps to (usually [`ApiError::Conflict`]).
    pub async fn book(
        &self,
        availability: &ConsultantAvailability,
        schedule_id: i64,
        description: Option<String>,
        now: NaiveDateTime,
    ) -> Result<BookingOutcome, ApiError> {
        let entry = availability.find(schedule_id).ok_or_else(|| {
            ApiError::validation(format!(
                "schedule {} is not offered by consultant {}",
                schedule_id, availability.consultant_id
            ))
        })?;
        validate_selection(entry, now)?;

        let draft = AppointmentDraft::for_entry(entry, &availability.consultant_id, description);
        let appointment = match self.api.create_appointment(draft).await {
            Ok(appointment) => appointment,
            Err(err) => {
                warn!(schedule_id, error = %err, "booking failed");
                return Err(err);
            }
        };
        info!(schedule_id, consultant_id = %availability.consultant_id, "booked appointment");

        let availability = match self.load_availability(&availability.consultant_id, now).await {
            Ok(refreshed) => Some(refreshed),
            Err(err) => {
                warn!(error = %err, "failed to refresh schedules after booking");
                None
            }
        };
        Ok(BookingOutcome {
            appointment,
            availability,
        })
    }
}
