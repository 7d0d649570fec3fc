use axum::{extract::{Path, State}, http::StatusCode, response::IntoResponse, Json};
use crate::api::dtos::{
    requests::{ConfirmPaymentRequest, EventActionRequest},
    responses::{ApiResponse, CheckInResponse, JoinResponse, PaymentResponse, ReservationView},
};
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::{reservation::ReservationState, user::Role};
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;
use serde_json::json;

pub async fn make_reservation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<EventActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Participant])?;

    let outcome = state.reservation_service.join(&user.id, &payload.event_id).await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(JoinResponse {
        reservation: outcome.reservation.into(),
        proceed_to_payment: outcome.proceed_to_payment,
    })))
}

pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Participant])?;

    let reservation = state.reservation_service
        .confirm_payment(&user.id, &payload.event_id, payload.auto_check_in.unwrap_or(false))
        .await?;

    Ok(ApiResponse::ok(PaymentResponse {
        reservation_id: reservation.id.clone(),
        is_checked_in: reservation.state == ReservationState::CheckedIn,
        reservation: reservation.into(),
    }))
}

pub async fn check_in(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<EventActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Participant])?;

    let reservation = state.reservation_service.check_in(&user.id, &payload.event_id).await?;

    Ok(Json(json!({
        "success": true,
        "checked_in": true,
        "data": CheckInResponse {
            reservation_id: reservation.id,
            checked_in: true,
        },
    })))
}

pub async fn list_my_reservations(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Participant])?;

    let reservations = state.reservation_service.list_for_participant(&user.id).await?;
    let views: Vec<ReservationView> = reservations.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(views))
}

pub async fn get_my_reservation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Participant])?;

    let reservation = state.reservation_service.find_for_participant(&user.id, &event_id).await?;
    Ok(ApiResponse::ok(ReservationView::from(reservation)))
}

pub async fn list_event_reservations(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let reservations = state.reservation_service.list_for_event(&user, &event_id).await?;
    let views: Vec<ReservationView> = reservations.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(views))
}

pub async fn approve_reservation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((event_id, reservation_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = state.reservation_service.approve(&user, &event_id, &reservation_id).await?;
    Ok(ApiResponse::ok(ReservationView::from(reservation)))
}
