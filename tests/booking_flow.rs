use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use counsel_booking::clients::backend_client::{ApiRequest, ApiResponse, BackendTransport, Method, TransportError};
use counsel_booking::error::{ApiError, NETWORK_ERROR_MESSAGE};
use counsel_booking::models::appointment::{AppointmentChanges, AppointmentDraft, AppointmentStatus};
use counsel_booking::service::api_service::{
    ApiService, CHECK_IN_ALREADY_DONE, CHECK_IN_NOT_FOUND, CHECK_IN_TOO_EARLY,
};
use counsel_booking::service::booking_service::BookingService;
use serde_json::{Value, json};

struct FakeBackend {
    routes: Mutex<HashMap<String, VecDeque<Result<ApiResponse, TransportError>>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(method, path, Ok(ApiResponse { status, body: body.to_string() }));
    }

    fn fail(&self, method: Method, path: &str, err: TransportError) {
        self.push(method, path, Err(err));
    }

    fn push(&self, method: Method, path: &str, reply: Result<ApiResponse, TransportError>) {
        let mut routes = self.routes.lock().unwrap();
        routes.entry(format!("{} {}", method, path)).or_default().push_back(reply);
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BackendTransport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        let key = format!("{} {}", request.method, request.path);
        match routes.get_mut(&key) {
            // the last queued reply repeats
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue.front().cloned().unwrap(),
            _ => Ok(ApiResponse {
                status: 404,
                body: json!({"message": format!("no route for {}", key)}).to_string(),
            }),
        }
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, 2)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn schedule(id: i64, date: &str, start: &str, status: i64, slot_id: i64) -> Value {
    json!({
        "id": id,
        "date": date,
        "bookedStatus": status,
        "slotId": slot_id,
        "consultantId": 5,
        "slot": {"slotStart": start, "slotEnd": "23:00:00"}
    })
}

fn consultant_schedules() -> Value {
    json!([
        schedule(1, "2026-02-04", "09:00:00", 1, 71),
        schedule(2, "2026-02-01", "09:00:00", 1, 72),
        schedule(3, "2026-02-02", "08:00:00", 1, 73),
        schedule(4, "2026-02-02", "14:00:00", 1, 74),
        schedule(5, "2026-02-03", "09:00:00", 0, 75),
        "garbage",
        {"id": 6, "date": "2026-02-03", "bookedStatus": 1, "slotId": 76, "consultantId": 5},
        {"id": 7, "date": "2026-02-02", "bookedStatus": 1, "slotId": 77, "consultantId": 5}
    ])
}

fn ids(entries: &[counsel_booking::models::schedule::ScheduleEntry]) -> Vec<i64> {
    entries.iter().map(|e| e.id).collect()
}

#[tokio::test]
async fn availability_is_future_only_and_sorted_by_date() {
    let backend = FakeBackend::new();
    backend.respond(Method::Get, "schedules/consultant/5", 200, consultant_schedules());
    let api = ApiService::new(backend.clone());

    let availability = BookingService::new(&api).load_availability("5", now()).await.unwrap();

    let dates: Vec<&str> = availability.days.iter().map(|(d, _)| d.as_str()).collect();
    assert_eq!(dates, vec!["2026-02-02", "2026-02-03", "2026-02-04"]);
    assert_eq!(ids(&availability.days[0].1), vec![4]);
    assert_eq!(ids(&availability.days[1].1), vec![5, 6]);
    assert_eq!(ids(&availability.days[2].1), vec![1]);
    assert_eq!(availability.entries.len(), 7);
    assert!(availability.find(5).unwrap().booked);
}

#[tokio::test]
async fn booking_submits_payload_and_refetches() {
    let backend = FakeBackend::new();
    backend.respond(Method::Get, "schedules/consultant/5", 200, consultant_schedules());
    backend.respond(
        Method::Get,
        "schedules/consultant/5",
        200,
        json!([schedule(4, "2026-02-02", "14:00:00", 0, 74)]),
    );
    backend.respond(Method::Post, "appointment", 201, json!({"id": 99, "status": "BOOKED"}));
    let api = ApiService::new(backend.clone());
    let booking = BookingService::new(&api);

    let availability = booking.load_availability("5", now()).await.unwrap();
    let outcome = booking
        .book(&availability, 4, Some("first session".to_string()), now())
        .await
        .unwrap();

    assert_eq!(outcome.appointment["id"], 99);
    let refreshed = outcome.availability.expect("schedules should be re-fetched");
    assert!(refreshed.find(4).unwrap().booked);

    let requests = backend.requests();
    let paths: Vec<String> = requests.iter().map(|r| format!("{} {}", r.method, r.path)).collect();
    assert_eq!(
        paths,
        vec![
            "GET schedules/consultant/5",
            "POST appointment",
            "GET schedules/consultant/5"
        ]
    );
    assert_eq!(
        requests[1].body,
        Some(json!({
            "slotId": 74,
            "scheduleId": 4,
            "consultantId": 5,
            "description": "first session",
            "appointmentDate": "2026-02-02"
        }))
    );
}

#[tokio::test]
async fn booked_or_past_selection_never_reaches_backend() {
    let backend = FakeBackend::new();
    backend.respond(Method::Get, "schedules/consultant/5", 200, consultant_schedules());
    let api = ApiService::new(backend.clone());
    let booking = BookingService::new(&api);
    let availability = booking.load_availability("5", now()).await.unwrap();

    let booked = booking.book(&availability, 5, None, now()).await;
    assert!(matches!(booked, Err(ApiError::Conflict(_))));

    let past = booking.book(&availability, 3, None, now()).await;
    assert!(matches!(past, Err(ApiError::Validation(_))));

    // today without a start time cannot be matched against the clock
    let no_start = booking.book(&availability, 7, None, now()).await;
    assert!(matches!(no_start, Err(ApiError::Validation(_))));

    let unknown = booking.book(&availability, 404, None, now()).await;
    assert!(matches!(unknown, Err(ApiError::Validation(_))));

    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn stale_selection_rejected_by_backend_is_a_conflict() {
    let backend = FakeBackend::new();
    backend.respond(Method::Get, "schedules/consultant/5", 200, consultant_schedules());
    backend.respond(Method::Post, "appointment", 409, json!({"message": "Schedule already booked"}));
    let api = ApiService::new(backend.clone());
    let booking = BookingService::new(&api);
    let availability = booking.load_availability("5", now()).await.unwrap();

    let result = booking.book(&availability, 1, None, now()).await;

    assert_eq!(result.unwrap_err(), ApiError::Conflict("Schedule already booked".to_string()));
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn invalid_appointment_draft_sends_nothing() {
    let backend = FakeBackend::new();
    let api = ApiService::new(backend.clone());
    let valid = AppointmentDraft {
        slot_id: Some("7".to_string()),
        schedule_id: Some("11".to_string()),
        consultant_id: Some("5".to_string()),
        description: None,
        appointment_date: Some("2026-02-03".to_string()),
    };

    let mut zero_slot = valid.clone();
    zero_slot.slot_id = Some("0".to_string());
    let mut negative_schedule = valid.clone();
    negative_schedule.schedule_id = Some("-1".to_string());
    let mut fractional_consultant = valid.clone();
    fractional_consultant.consultant_id = Some("2.5".to_string());
    let mut no_date = valid.clone();
    no_date.appointment_date = None;

    for draft in [zero_slot, negative_schedule, fractional_consultant, no_date] {
        let result = api.create_appointment(draft).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn missing_response_is_a_network_error() {
    let backend = FakeBackend::new();
    backend.fail(
        Method::Get,
        "schedules/consultant/5",
        TransportError::NoResponse("connection refused".to_string()),
    );
    let api = ApiService::new(backend.clone());

    let result = BookingService::new(&api).load_availability("5", now()).await;

    assert_eq!(result.unwrap_err(), ApiError::Network(NETWORK_ERROR_MESSAGE.to_string()));
}

#[tokio::test]
async fn server_error_without_message_uses_generic_text() {
    let backend = FakeBackend::new();
    backend.respond(Method::Get, "schedules", 500, json!({"error": "boom"}));
    let api = ApiService::new(backend.clone());

    let err = api.get_schedules().await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Backend {
            status: 500,
            message: "Server error occurred".to_string()
        }
    );
}

#[tokio::test]
async fn check_in_maps_backend_codes() {
    let backend = FakeBackend::new();
    backend.respond(Method::Post, "appointment/1/check-in", 200, json!({"checkedIn": true}));
    backend.respond(Method::Post, "appointment/2/check-in", 400, json!({"message": "too early"}));
    backend.respond(Method::Post, "appointment/4/check-in", 409, json!({}));
    let api = ApiService::new(backend.clone());

    assert!(api.check_in_appointment("1").await.is_ok());
    assert_eq!(
        api.check_in_appointment("2").await.unwrap_err(),
        ApiError::Backend {
            status: 400,
            message: CHECK_IN_TOO_EARLY.to_string()
        }
    );
    assert_eq!(
        api.check_in_appointment("3").await.unwrap_err(),
        ApiError::NotFound(CHECK_IN_NOT_FOUND.to_string())
    );
    assert_eq!(
        api.check_in_appointment("4").await.unwrap_err(),
        ApiError::Conflict(CHECK_IN_ALREADY_DONE.to_string())
    );
}

#[tokio::test]
async fn status_update_is_whitelisted() {
    let backend = FakeBackend::new();
    backend.respond(Method::Put, "appointment/3/status", 200, json!({"id": 3, "status": "CONSULTED"}));
    let api = ApiService::new(backend.clone());

    assert!(matches!(
        api.update_appointment_status("3", "DONE").await,
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        api.update_appointment_status("0", "BOOKED").await,
        Err(ApiError::Validation(_))
    ));
    assert!(backend.requests().is_empty());

    api.update_appointment_status("3", AppointmentStatus::Consulted.as_str())
        .await
        .unwrap();
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query, vec![("status".to_string(), "CONSULTED".to_string())]);
}

#[tokio::test]
async fn member_appointments_are_joined_with_schedule_and_consultant() {
    let backend = FakeBackend::new();
    backend.respond(
        Method::Get,
        "appointment/account/12",
        200,
        json!([
            {"id": 1, "scheduleId": 4, "consultantId": 5, "status": "CONSULTED", "checkedIn": true},
            {"id": 2, "consultantId": 5}
        ]),
    );
    backend.respond(Method::Get, "schedules", 200, json!([schedule(4, "2026-02-02", "14:00:00", 0, 74)]));
    backend.respond(
        Method::Get,
        "consultants",
        200,
        json!([{"id": 5, "accountId": 50, "consultantName": "Dr. Lan"}]),
    );
    let api = ApiService::new(backend.clone());

    let items = api.get_member_appointments("12").await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].appointment.status, AppointmentStatus::Consulted);
    assert!(items[0].appointment.checked_in);
    let schedule = items[0].schedule.as_ref().unwrap();
    assert!(schedule.booked);
    assert_eq!(schedule.slot_label(), "14:00 - 23:00");
    assert_eq!(items[1].schedule, None);
    assert_eq!(items[1].consultant.as_ref().unwrap().consultant_name, "Dr. Lan");
}

#[tokio::test]
async fn appointment_update_sends_only_changed_fields() {
    let backend = FakeBackend::new();
    backend.respond(Method::Put, "appointments/8", 200, json!({"id": 8, "status": "CANCELLED"}));
    let api = ApiService::new(backend.clone());

    assert!(matches!(
        api.update_appointment("8", &AppointmentChanges::default()).await,
        Err(ApiError::Validation(_))
    ));
    let changes = AppointmentChanges {
        status: Some(AppointmentStatus::Cancelled),
        meeting_link: Some("https://meet.example/abc".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        api.update_appointment("-8", &changes).await,
        Err(ApiError::Validation(_))
    ));
    assert!(backend.requests().is_empty());

    api.update_appointment("8", &changes).await.unwrap();
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Put);
    assert_eq!(
        requests[0].body,
        Some(json!({"status": "CANCELLED", "meetingLink": "https://meet.example/abc"}))
    );
}

#[tokio::test]
async fn appointment_delete_validates_id_and_maps_missing() {
    let backend = FakeBackend::new();
    backend.respond(Method::Delete, "appointments/8", 200, json!({}));
    let api = ApiService::new(backend.clone());

    assert!(matches!(api.delete_appointment("abc").await, Err(ApiError::Validation(_))));
    assert!(backend.requests().is_empty());

    api.delete_appointment("8").await.unwrap();
    assert!(matches!(api.delete_appointment("9").await, Err(ApiError::NotFound(_))));

    let paths: Vec<String> = backend
        .requests()
        .iter()
        .map(|r| format!("{} {}", r.method, r.path))
        .collect();
    assert_eq!(paths, vec!["DELETE appointments/8", "DELETE appointments/9"]);
}
