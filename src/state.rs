use std::sync::Arc;
use crate::domain::ports::{
    UserRepository, AuthRepository, ProfileRepository, FacilityRepository,
    EventRepository, ReservationRepository, PhotoStore, Clock,
};
use crate::domain::services::{auth_service::AuthService, reservation_service::ReservationService};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub user_repo: Arc<dyn UserRepository>,
    pub auth_repo: Arc<dyn AuthRepository>,
    pub profile_repo: Arc<dyn ProfileRepository>,
    pub facility_repo: Arc<dyn FacilityRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub auth_service: Arc<AuthService>,
    pub reservation_service: Arc<ReservationService>,
    pub photo_store: Arc<dyn PhotoStore>,
    pub clock: Arc<dyn Clock>,
}
