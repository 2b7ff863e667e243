pub mod api_service;
pub mod availability;
pub mod booking_service;
pub mod staff_schedule_service;
