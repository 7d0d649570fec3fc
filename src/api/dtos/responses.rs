use crate::domain::models::{event::Event, reservation::{Reservation, ReservationState}};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

/// Wire shape of a reservation. The boolean flags are derived from the
/// lifecycle state; `is_approved` is left out while waitlisted.
#[derive(Serialize, Deserialize)]
pub struct ReservationView {
    pub id: String,
    pub event_id: String,
    pub participant_id: String,
    pub state: ReservationState,
    pub is_wait_listed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    pub is_paid: bool,
    pub is_checked_in: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationView {
    fn from(r: Reservation) -> Self {
        Self {
            is_wait_listed: r.state == ReservationState::Waitlisted,
            is_approved: r.state.is_admitted().then_some(true),
            is_paid: r.state.is_paid(),
            is_checked_in: r.state == ReservationState::CheckedIn,
            id: r.id,
            event_id: r.event_id,
            participant_id: r.participant_id,
            state: r.state,
            paid_at: r.paid_at,
            checked_in_at: r.checked_in_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct JoinResponse {
    pub reservation: ReservationView,
    pub proceed_to_payment: bool,
}

#[derive(Serialize, Deserialize)]
pub struct PaymentResponse {
    pub reservation_id: String,
    pub is_checked_in: bool,
    pub reservation: ReservationView,
}

#[derive(Serialize, Deserialize)]
pub struct CheckInResponse {
    pub reservation_id: String,
    pub checked_in: bool,
}

#[derive(Serialize, Deserialize)]
pub struct EventPage {
    pub items: Vec<Event>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}
