use axum::{extract::State, response::IntoResponse, Json};
use crate::api::dtos::{requests::UpsertProfileRequest, responses::ApiResponse};
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::{profile::ParticipantProfile, user::Role};
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn upsert_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Participant])?;

    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::Validation("first_name and last_name are required".into()));
    }

    let now = state.clock.now();
    let mut profile = match state.profile_repo.find_by_user(&user.id).await? {
        Some(existing) => existing,
        None => {
            let mut fresh = ParticipantProfile::new(user.id.clone(), String::new(), String::new());
            fresh.created_at = now;
            fresh
        }
    };

    profile.first_name = first_name.to_string();
    profile.last_name = last_name.to_string();
    profile.phone = payload.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    profile.birth_date = payload.birth_date;
    profile.updated_at = now;

    let saved = state.profile_repo.upsert(&profile).await?;
    info!(user_id = %user.id, "Participant profile saved");

    Ok(ApiResponse::ok(saved))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Participant])?;

    let profile = state.profile_repo.find_by_user(&user.id).await?
        .ok_or(AppError::NotFound("Participant profile not found".into()))?;

    Ok(ApiResponse::ok(profile))
}
