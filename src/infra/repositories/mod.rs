pub mod sqlite_user_repo;
pub mod sqlite_auth_repo;
pub mod sqlite_profile_repo;
pub mod sqlite_facility_repo;
pub mod sqlite_event_repo;
pub mod sqlite_reservation_repo;

pub mod postgres_user_repo;
pub mod postgres_auth_repo;
pub mod postgres_profile_repo;
pub mod postgres_facility_repo;
pub mod postgres_event_repo;
pub mod postgres_reservation_repo;
