pub mod auth;
pub mod event;
pub mod facility;
pub mod profile;
pub mod reservation;
pub mod user;
