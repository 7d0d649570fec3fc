pub mod auth_service;
pub mod reservation_service;
