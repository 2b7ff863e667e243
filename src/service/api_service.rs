use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::clients::backend_client::{ApiRequest, BackendTransport, TransportError};
use crate::error::{ApiError, NETWORK_ERROR_MESSAGE, SERVER_ERROR_MESSAGE, UNEXPECTED_ERROR_MESSAGE};
use crate::models::appointment::{
    Appointment, AppointmentChanges, AppointmentDraft, AppointmentStatus, MemberAppointment,
    RawAppointment, enrich_member_appointments, positive_id,
};
use crate::models::blog::{Blog, BlogDraft, RawBlog};
use crate::models::consultant::{Consultant, RawAccount, RawConsultant};
use crate::models::schedule::{
    DATE_FORMAT, RawSchedule, ScheduleEntry, ScheduleRegistration, ingest_schedules,
    parse_schedule_date,
};
use crate::models::slot::{NewSlot, RawSlot, Slot};

pub const CHECK_IN_TOO_EARLY: &str =
    "The appointment cannot be checked in at this time. Please check the appointment time.";
pub const CHECK_IN_NOT_FOUND: &str = "Appointment not found.";
pub const CHECK_IN_ALREADY_DONE: &str = "The appointment has already been checked in.";

/// Typed access to the consultation backend. Input is validated here before
/// anything is sent; every failure comes back as an [`ApiError`].
pub struct ApiService {
    transport: Arc<dyn BackendTransport>,
    timezone: Tz,
}

impl ApiService {
    pub fn new(transport: Arc<dyn BackendTransport>) -> Self {
        Self {
            transport,
            timezone: Tz::UTC,
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    async fn execute(&self, request: ApiRequest) -> Result<String, ApiError> {
        let method = request.method;
        let path = request.path.clone();
        match self.transport.send(request).await {
            Ok(response) if (200..300).contains(&response.status) => Ok(response.body),
            Ok(response) => {
                let message = extract_message(&response.body);
                warn!(%method, %path, status = response.status, %message, "backend rejected request");
                Err(ApiError::from_status(response.status, message))
            }
            Err(TransportError::NoResponse(detail)) => {
                warn!(%method, %path, %detail, "no response from backend");
                Err(ApiError::Network(NETWORK_ERROR_MESSAGE.to_string()))
            }
            Err(TransportError::Other(detail)) => {
                warn!(%method, %path, %detail, "request failed");
                Err(ApiError::Unexpected(UNEXPECTED_ERROR_MESSAGE.to_string()))
            }
        }
    }

    async fn fetch_json(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let body = self.execute(request).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "backend returned invalid JSON");
            ApiError::Unexpected(UNEXPECTED_ERROR_MESSAGE.to_string())
        })
    }

    async fn fetch_list(&self, request: ApiRequest) -> Result<Vec<Value>, ApiError> {
        match self.fetch_json(request).await? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => {
                warn!(kind = json_kind(&other), "expected a list from backend");
                Err(ApiError::Unexpected(UNEXPECTED_ERROR_MESSAGE.to_string()))
            }
        }
    }

    async fn send_json<B: Serialize>(&self, request: ApiRequest, body: &B) -> Result<Value, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Unexpected(format!("failed to encode request: {}", e)))?;
        self.fetch_json(request.json(body)).await
    }

    // --- consultants

    pub async fn get_consultants(&self) -> Result<Vec<Consultant>, ApiError> {
        let records: Vec<RawConsultant> = decode_each(self.fetch_list(ApiRequest::get("consultants")).await?);
        if records.is_empty() {
            warn!("no consultants returned by backend");
            return Ok(Vec::new());
        }
        let mut consultants = Vec::with_capacity(records.len());
        for record in &records {
            let account = match record.account_id.as_ref().and_then(|id| id.as_i64()) {
                Some(account_id) => match self.get_account(account_id).await {
                    Ok(account) => Some(account),
                    Err(err) => {
                        warn!(account_id, error = %err, "no account info for consultant");
                        None
                    }
                },
                None => None,
            };
            consultants.push(Consultant::merge(record, account.as_ref()));
        }
        Ok(consultants)
    }

    /// Looks a consultant up by account id.
    pub async fn get_consultant(&self, account_id: &str) -> Result<Consultant, ApiError> {
        let account_id = positive_id(account_id, "account id")?;
        let account = self.get_account(account_id).await?;
        if !Consultant::is_consultant_account(&account) {
            return Err(ApiError::NotFound("account is not a consultant".to_string()));
        }
        let records: Vec<RawConsultant> = decode_each(self.fetch_list(ApiRequest::get("consultants")).await?);
        let record = records
            .iter()
            .find(|c| c.account_id.as_ref().and_then(|id| id.as_i64()) == Some(account_id))
            .ok_or_else(|| ApiError::NotFound("consultant information not found".to_string()))?;
        Ok(Consultant::merge(record, Some(&account)))
    }

    async fn get_account(&self, account_id: i64) -> Result<RawAccount, ApiError> {
        let value = self.fetch_json(ApiRequest::get(format!("account/{}", account_id))).await?;
        decode_one(value, "account")
    }

    // --- schedules and slots

    pub async fn get_schedules(&self) -> Result<Vec<ScheduleEntry>, ApiError> {
        Ok(ingest_schedules(self.fetch_list(ApiRequest::get("schedules")).await?))
    }

    pub async fn get_schedule(&self, schedule_id: &str) -> Result<ScheduleEntry, ApiError> {
        let schedule_id = positive_id(schedule_id, "schedule id")?;
        let value = self.fetch_json(ApiRequest::get(format!("schedules/{}", schedule_id))).await?;
        let raw: RawSchedule = decode_one(value, "schedule")?;
        ScheduleEntry::from_raw(raw).map_err(|reason| {
            warn!(schedule_id, %reason, "unusable schedule record");
            ApiError::Unexpected(UNEXPECTED_ERROR_MESSAGE.to_string())
        })
    }

    pub async fn get_consultant_schedules(&self, consultant_id: &str) -> Result<Vec<ScheduleEntry>, ApiError> {
        let consultant_id = positive_id(consultant_id, "consultant id")?;
        let records = self
            .fetch_list(ApiRequest::get(format!("schedules/consultant/{}", consultant_id)))
            .await?;
        Ok(ingest_schedules(records))
    }

    pub async fn get_slots(&self) -> Result<Vec<Slot>, ApiError> {
        let records: Vec<RawSlot> = decode_each(self.fetch_list(ApiRequest::get("slot")).await?);
        Ok(records.into_iter().filter_map(Slot::from_raw).collect())
    }

    pub async fn create_slot(&self, slot: &NewSlot) -> Result<Value, ApiError> {
        if slot.slot_start >= slot.slot_end {
            return Err(ApiError::validation("slot start must be before slot end"));
        }
        self.send_json(ApiRequest::post("slot"), slot).await
    }

    /// Claims `slot_ids` for a consultant on `date`.
    pub async fn register_schedule(
        &self,
        consultant_id: &str,
        date: &str,
        slot_ids: &[i64],
    ) -> Result<Value, ApiError> {
        let consultant_id = positive_id(consultant_id, "consultant id")?;
        let date = parse_schedule_date(date)
            .ok_or_else(|| ApiError::validation(format!("invalid date: {}", date)))?;
        if slot_ids.is_empty() {
            return Err(ApiError::validation("select at least one slot"));
        }
        if let Some(bad) = slot_ids.iter().find(|id| **id <= 0) {
            return Err(ApiError::validation(format!("invalid slot id: {}", bad)));
        }
        let body = ScheduleRegistration {
            date: date.format(DATE_FORMAT).to_string(),
            consultant_id,
            slot_ids: slot_ids.to_vec(),
        };
        let response = self.send_json(ApiRequest::post("slot/register"), &body).await?;
        info!(consultant_id, date = %body.date, slots = body.slot_ids.len(), "registered schedule slots");
        Ok(response)
    }

    // --- appointments

    pub async fn create_appointment(&self, draft: AppointmentDraft) -> Result<Value, ApiError> {
        let payload = draft.validate()?;
        let response = self.send_json(ApiRequest::post("appointment"), &payload).await?;
        info!(
            schedule_id = payload.schedule_id,
            consultant_id = payload.consultant_id,
            "appointment created"
        );
        Ok(response)
    }

    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        changes: &AppointmentChanges,
    ) -> Result<Value, ApiError> {
        let appointment_id = positive_id(appointment_id, "appointment id")?;
        if changes.is_empty() {
            return Err(ApiError::validation("nothing to update"));
        }
        let response = self
            .send_json(ApiRequest::put(format!("appointments/{}", appointment_id)), changes)
            .await?;
        info!(appointment_id, "appointment updated");
        Ok(response)
    }

    pub async fn delete_appointment(&self, appointment_id: &str) -> Result<Value, ApiError> {
        let appointment_id = positive_id(appointment_id, "appointment id")?;
        let response = self
            .fetch_json(ApiRequest::delete(format!("appointments/{}", appointment_id)))
            .await?;
        info!(appointment_id, "appointment deleted");
        Ok(response)
    }

    pub async fn update_appointment_status(&self, appointment_id: &str, status: &str) -> Result<Value, ApiError> {
        let appointment_id = positive_id(appointment_id, "appointment id")?;
        let status: AppointmentStatus = status.parse()?;
        let request = ApiRequest::put(format!("appointment/{}/status", appointment_id))
            .query("status", status.as_str());
        self.fetch_json(request).await
    }

    pub async fn get_appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        let records: Vec<RawAppointment> = decode_each(self.fetch_list(ApiRequest::get("appointment")).await?);
        Ok(records.into_iter().filter_map(Appointment::from_raw).collect())
    }

    pub async fn get_member_appointments(&self, member_id: &str) -> Result<Vec<MemberAppointment>, ApiError> {
        let member_id = positive_id(member_id, "member id")?;
        let records: Vec<RawAppointment> = decode_each(
            self.fetch_list(ApiRequest::get(format!("appointment/account/{}", member_id)))
                .await?,
        );
        let appointments: Vec<Appointment> = records.into_iter().filter_map(Appointment::from_raw).collect();
        let missing = appointments.iter().filter(|a| a.schedule_id.is_none()).count();
        if missing > 0 {
            warn!(member_id, missing, "appointments without schedule id");
        }
        let schedules = self.get_schedules().await?;
        let consultants: Vec<RawConsultant> = decode_each(self.fetch_list(ApiRequest::get("consultants")).await?);
        Ok(enrich_member_appointments(appointments, &schedules, &consultants))
    }

    pub async fn check_in_appointment(&self, appointment_id: &str) -> Result<Value, ApiError> {
        let appointment_id = positive_id(appointment_id, "appointment id")?;
        let request = ApiRequest::post(format!("appointment/{}/check-in", appointment_id));
        self.fetch_json(request).await.map_err(|err| match err.status() {
            Some(400) => ApiError::Backend {
                status: 400,
                message: CHECK_IN_TOO_EARLY.to_string(),
            },
            Some(404) => ApiError::NotFound(CHECK_IN_NOT_FOUND.to_string()),
            Some(409) => ApiError::Conflict(CHECK_IN_ALREADY_DONE.to_string()),
            _ => err,
        })
    }

    // --- blogs

    pub async fn get_blogs(&self) -> Result<Vec<Blog>, ApiError> {
        let today = self.today();
        let records: Vec<RawBlog> = decode_each(self.fetch_list(ApiRequest::get("blogs")).await?);
        Ok(records
            .into_iter()
            .filter_map(|raw| Blog::from_raw(raw, today))
            .collect())
    }

    pub async fn get_blog(&self, blog_id: &str) -> Result<Blog, ApiError> {
        let blog_id = positive_id(blog_id, "blog id")?;
        let value = self.fetch_json(ApiRequest::get(format!("blogs/{}", blog_id))).await?;
        if value.is_null() {
            return Err(ApiError::NotFound("blog not found".to_string()));
        }
        let raw: RawBlog = decode_one(value, "blog")?;
        Blog::from_raw(raw, self.today()).ok_or_else(|| ApiError::NotFound("blog not found".to_string()))
    }

    pub async fn create_blog(&self, draft: BlogDraft) -> Result<Value, ApiError> {
        if draft.title.trim().is_empty() {
            return Err(ApiError::validation("missing required field: title"));
        }
        let payload = draft.into_payload(self.today());
        self.send_json(ApiRequest::post("blogs"), &payload).await
    }

    pub async fn update_blog(&self, blog_id: &str, draft: BlogDraft) -> Result<Value, ApiError> {
        let blog_id = positive_id(blog_id, "blog id")?;
        if draft.title.trim().is_empty() {
            return Err(ApiError::validation("missing required field: title"));
        }
        let payload = draft.into_payload(self.today());
        self.send_json(ApiRequest::put(format!("blogs/{}", blog_id)), &payload).await
    }

    pub async fn delete_blog(&self, blog_id: &str) -> Result<Value, ApiError> {
        let blog_id = positive_id(blog_id, "blog id")?;
        self.fetch_json(ApiRequest::delete(format!("blogs/{}", blog_id))).await
    }
}

/// `message` from a JSON error body, or the generic server error text.
pub fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_string())
}

// Drops list items that do not decode instead of failing the listing.
fn decode_each<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "skipping undecodable record");
                None
            }
        })
        .collect()
}

fn decode_one<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| {
        warn!(error = %err, "undecodable {}", what);
        ApiError::Unexpected(UNEXPECTED_ERROR_MESSAGE.to_string())
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
