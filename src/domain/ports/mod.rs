use crate::domain::models::{
    user::User, auth::RefreshTokenRecord, profile::ParticipantProfile,
    facility::{Facility, Salon}, event::{Event, EventFilter, Page}, reservation::{Reservation, ReservationState},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;
    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
    async fn delete_refresh_token(&self, token_hash: &str) -> Result<(), AppError>;
    async fn delete_refresh_family(&self, family_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn upsert(&self, profile: &ParticipantProfile) -> Result<ParticipantProfile, AppError>;
    async fn find_by_user(&self, user_id: &str) -> Result<Option<ParticipantProfile>, AppError>;
}

#[async_trait]
pub trait FacilityRepository: Send + Sync {
    async fn create(&self, facility: &Facility) -> Result<Facility, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Facility>, AppError>;
    async fn list(&self) -> Result<Vec<Facility>, AppError>;
    async fn create_salon(&self, salon: &Salon) -> Result<Salon, AppError>;
    async fn find_salon(&self, id: &str) -> Result<Option<Salon>, AppError>;
    async fn list_salons(&self, facility_id: &str) -> Result<Vec<Salon>, AppError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    /// Returns the requested page and the total number of matching events.
    async fn list(&self, filter: &EventFilter, page: Page) -> Result<(Vec<Event>, i64), AppError>;
    /// Fails with `Conflict` when `event.capacity` is below the number of
    /// admitted reservations at the time of the write.
    async fn update(&self, event: &Event) -> Result<Event, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Counts admitted reservations and inserts `reservation` in one
    /// transaction, demoting it to WAITLISTED when the event's capacity, as
    /// read under the event lock, is reached.
    async fn create_within_capacity(&self, reservation: &Reservation) -> Result<Reservation, AppError>;
    /// Promotes a WAITLISTED reservation if a slot is free, atomically.
    async fn admit_within_capacity(&self, reservation: &Reservation) -> Result<Reservation, AppError>;
    /// Writes `next` only if the stored state is still `expected`.
    async fn transition(&self, next: &Reservation, expected: ReservationState) -> Result<Reservation, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError>;
    async fn find_by_participant_and_event(&self, participant_id: &str, event_id: &str) -> Result<Option<Reservation>, AppError>;
    async fn list_by_participant(&self, participant_id: &str) -> Result<Vec<Reservation>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Reservation>, AppError>;
    async fn count_admitted(&self, event_id: &str) -> Result<i64, AppError>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Persists the file and returns its public URL.
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError>;
}
