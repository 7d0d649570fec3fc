use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::api::dtos::{requests::{CreateFacilityRequest, CreateSalonRequest}, responses::ApiResponse};
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::{facility::{Facility, Salon}, user::Role};
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_facility(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateFacilityRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Facility, Role::Admin])?;

    let name = payload.name.trim();
    let address = payload.address.trim();
    if name.is_empty() || address.is_empty() {
        return Err(AppError::Validation("name and address are required".into()));
    }

    let facility = Facility::new(user.id.clone(), name.to_string(), address.to_string());
    let created = state.facility_repo.create(&facility).await?;

    info!(facility_id = %created.id, owner_id = %user.id, "Facility created");
    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

pub async fn list_facilities(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let facilities = state.facility_repo.list().await?;
    Ok(ApiResponse::ok(facilities))
}

pub async fn get_facility(
    State(state): State<Arc<AppState>>,
    Path(facility_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let facility = state.facility_repo.find_by_id(&facility_id).await?
        .ok_or(AppError::NotFound("Facility not found".into()))?;
    Ok(ApiResponse::ok(facility))
}

pub async fn create_salon(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(facility_id): Path<String>,
    Json(payload): Json<CreateSalonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let facility = state.facility_repo.find_by_id(&facility_id).await?
        .ok_or(AppError::NotFound("Facility not found".into()))?;

    if !user.is_admin() && facility.owner_id != user.id {
        return Err(AppError::Forbidden("Only the facility owner can add salons".into()));
    }

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }

    let salon = Salon::new(facility.id.clone(), name.to_string());
    let created = state.facility_repo.create_salon(&salon).await?;

    info!(salon_id = %created.id, facility_id = %facility.id, "Salon created");
    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

pub async fn list_salons(
    State(state): State<Arc<AppState>>,
    Path(facility_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.facility_repo.find_by_id(&facility_id).await?
        .ok_or(AppError::NotFound("Facility not found".into()))?;

    let salons = state.facility_repo.list_salons(&facility_id).await?;
    Ok(ApiResponse::ok(salons))
}
