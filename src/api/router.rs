use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, auth, profile, facility, event, reservation};
use crate::api::middleware::rotate_access_token;
use tower_http::{
    services::ServeDir,
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

/// Multipart framing on top of the configured photo size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/health", get(health::health_check))

        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))

        // Participant
        .route("/participant/profile", get(profile::get_profile).put(profile::upsert_profile))
        .route("/participant/make-reservation", post(reservation::make_reservation))
        .route("/participant/confirm-payment", post(reservation::confirm_payment))
        .route("/participant/check-in", post(reservation::check_in))
        .route("/participant/reservations", get(reservation::list_my_reservations))
        .route("/participant/reservations/{event_id}", get(reservation::get_my_reservation))

        // Facilities
        .route("/facilities", post(facility::create_facility).get(facility::list_facilities))
        .route("/facilities/{facility_id}", get(facility::get_facility))
        .route("/facilities/{facility_id}/salons", post(facility::create_salon).get(facility::list_salons))

        // Events
        .route("/events", post(event::create_event).get(event::list_events))
        .route("/events/{event_id}", get(event::get_event).put(event::update_event).delete(event::delete_event))
        .route(
            "/events/{event_id}/photo",
            post(event::upload_photo).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/events/{event_id}/reservations", get(reservation::list_event_reservations))
        .route(
            "/events/{event_id}/reservations/{reservation_id}/approve",
            post(reservation::approve_reservation),
        )

        .nest_service("/uploads", uploads)

        .layer(middleware::from_fn_with_state(state.clone(), rotate_access_token))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                        role = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
