use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use super::api_service::ApiService;
use super::availability::{SlotAvailability, compute_booked_slot_ids, day_availability};
use crate::error::ApiError;
use crate::models::normalize_id;
use crate::models::schedule::{DATE_FORMAT, ScheduleEntry};

#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub response: Value,
    pub registered: Vec<i64>,
    pub schedules: Option<Vec<ScheduleEntry>>,
}

/// The staff side: which slots a consultant already has booked on a day,
/// and registering new working slots.
pub struct StaffScheduleService<'a> {
    api: &'a ApiService,
}

impl<'a> StaffScheduleService<'a> {
    pub fn new(api: &'a ApiService) -> Self {
        Self { api }
    }

    pub async fn day_view(&self, consultant_id: &str, date: NaiveDate) -> Result<Vec<SlotAvailability>, ApiError> {
        let slots = self.api.get_slots().await?;
        let schedules = self.api.get_schedules().await?;
        Ok(day_availability(&slots, &schedules, consultant_id, date))
    }

    /// The staff schedule table: entries with a complete slot, optionally
    /// narrowed to one consultant.
    pub async fn schedules_for(&self, consultant_id: Option<&str>) -> Result<Vec<ScheduleEntry>, ApiError> {
        let schedules = self.api.get_schedules().await?;
        let total = schedules.len();
        let listed: Vec<ScheduleEntry> = schedules.into_iter().filter(has_slot_window).collect();
        if listed.len() < total {
            debug!(skipped = total - listed.len(), "schedules without a complete slot left out");
        }
        Ok(match consultant_id.map(normalize_id) {
            Some(id) => listed
                .into_iter()
                .filter(|entry| entry.consultant_id.as_deref() == Some(id.as_str()))
                .collect(),
            None => listed,
        })
    }

    pub async fn register(
        &self,
        consultant_id: &str,
        date: NaiveDate,
        slot_ids: &[i64],
        today: NaiveDate,
    ) -> Result<RegistrationOutcome, ApiError> {
        if date < today {
            return Err(ApiError::validation("cannot register slots on a past date"));
        }
        let selected: BTreeSet<i64> = slot_ids.iter().copied().collect();
        if selected.is_empty() {
            return Err(ApiError::validation(
                "select a consultant, a date and at least one time slot",
            ));
        }

        let schedules = self.api.get_schedules().await?;
        let booked = compute_booked_slot_ids(&schedules, consultant_id, date);
        if let Some(taken) = selected.iter().find(|id| booked.contains(&id.to_string())) {
            return Err(ApiError::conflict(format!("slot {} is already booked", taken)));
        }

        let registered: Vec<i64> = selected.into_iter().collect();
        let date_key = date.format(DATE_FORMAT).to_string();
        let response = self
            .api
            .register_schedule(consultant_id, &date_key, &registered)
            .await?;

        let schedules = match self.api.get_schedules().await {
            Ok(schedules) => Some(schedules),
            Err(err) => {
                warn!(error = %err, "failed to refresh schedules after registration");
                None
            }
        };
        Ok(RegistrationOutcome {
            response,
            registered,
            schedules,
        })
    }
}

fn has_slot_window(entry: &ScheduleEntry) -> bool {
    entry.slot_id.is_some() && entry.slot_start.is_some() && entry.slot_end.is_some()
}
