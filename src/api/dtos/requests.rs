use crate::domain::models::{event::{Fee, PriceType}, user::Role};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpsertProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct CreateFacilityRequest {
    pub name: String,
    pub address: String,
}

#[derive(Deserialize)]
pub struct CreateSalonRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub sport: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub price_type: PriceType,
    pub participation_fee: Option<Fee>,
    pub backup_coach_id: Option<String>,
    pub facility_id: Option<String>,
    pub salon_id: Option<String>,
    pub location: Option<String>,
}

/// Partial update. Sending any of `facility_id`, `salon_id` or `location`
/// replaces the whole location with what was sent.
#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub sport: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub price_type: Option<PriceType>,
    pub participation_fee: Option<Fee>,
    pub backup_coach_id: Option<String>,
    pub facility_id: Option<String>,
    pub salon_id: Option<String>,
    pub location: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ListEventsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub price_type: Option<String>,
    pub owner_id: Option<String>,
    pub sport: Option<String>,
    pub q: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub upcoming: Option<bool>,
}

#[derive(Deserialize)]
pub struct EventActionRequest {
    pub event_id: String,
}

#[derive(Deserialize)]
pub struct ConfirmPaymentRequest {
    pub event_id: String,
    pub auto_check_in: Option<bool>,
}
