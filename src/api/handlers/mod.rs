pub mod auth;
pub mod event;
pub mod facility;
pub mod health;
pub mod profile;
pub mod reservation;
