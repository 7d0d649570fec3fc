use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crate::api::dtos::{
    requests::{CreateEventRequest, ListEventsQuery, UpdateEventRequest},
    responses::{ApiResponse, EventPage},
};
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::{
    auth::CurrentUser,
    event::{validate_pricing, validate_schedule, Event, EventFilter, EventLocation, Page, PriceType},
    user::Role,
};
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;
use uuid::Uuid;
use tracing::{info, warn};

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_role(&[Role::Coach, Role::Admin])?;

    let title = payload.title.trim().to_string();
    let sport = payload.sport.trim().to_string();
    if title.is_empty() || sport.is_empty() {
        return Err(AppError::Validation("title and sport are required".into()));
    }

    validate_schedule(payload.start_time, payload.end_time, payload.capacity)?;
    let participation_fee = validate_pricing(payload.price_type, payload.participation_fee)?;

    let location = EventLocation::from_parts(payload.facility_id, payload.salon_id, payload.location)?;
    ensure_location_exists(&state, &location).await?;

    if let Some(backup_id) = &payload.backup_coach_id {
        ensure_backup_coach(&state, backup_id, &user.id).await?;
    }

    let (facility_id, salon_id, location) = location.into_columns();
    let now = state.clock.now();

    let event = Event {
        id: Uuid::new_v4().to_string(),
        owner_id: user.id.clone(),
        backup_coach_id: payload.backup_coach_id,
        title,
        description: payload.description.unwrap_or_default(),
        sport,
        start_time: payload.start_time,
        end_time: payload.end_time,
        capacity: payload.capacity,
        price_type: payload.price_type,
        participation_fee,
        facility_id,
        salon_id,
        location,
        photo_url: None,
        created_at: now,
        updated_at: now,
    };

    let created = state.event_repo.create(&event).await?;
    info!(event_id = %created.id, owner_id = %user.id, "Event created");

    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    Ok(ApiResponse::ok(event))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(query.page, query.limit)?;

    let price_type = query.price_type
        .as_deref()
        .map(str::parse::<PriceType>)
        .transpose()?;

    let after = query.upcoming
        .unwrap_or(false)
        .then(|| state.clock.now());

    let filter = EventFilter {
        price_type,
        owner_id: query.owner_id.filter(|s| !s.is_empty()),
        sport: query.sport.filter(|s| !s.is_empty()),
        search: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        from: query.from,
        after,
        to: query.to,
    };

    let (items, total) = state.event_repo.list(&filter, page).await?;

    Ok(ApiResponse::ok(EventPage {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;
    ensure_owner(&user, &event)?;

    if let Some(title) = payload.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("title cannot be empty".into()));
        }
        event.title = title;
    }
    if let Some(sport) = payload.sport {
        let sport = sport.trim().to_string();
        if sport.is_empty() {
            return Err(AppError::Validation("sport cannot be empty".into()));
        }
        event.sport = sport;
    }
    if let Some(description) = payload.description {
        event.description = description;
    }
    if let Some(start_time) = payload.start_time {
        event.start_time = start_time;
    }
    if let Some(end_time) = payload.end_time {
        event.end_time = end_time;
    }
    if let Some(capacity) = payload.capacity {
        event.capacity = capacity;
    }
    validate_schedule(event.start_time, event.end_time, event.capacity)?;

    if payload.price_type.is_some() || payload.participation_fee.is_some() {
        let price_type = payload.price_type.unwrap_or(event.price_type);
        let fee = match payload.participation_fee {
            Some(fee) => Some(fee),
            None if price_type == PriceType::Free => None,
            None => event.participation_fee,
        };
        event.participation_fee = validate_pricing(price_type, fee)?;
        event.price_type = price_type;
    }

    if payload.facility_id.is_some() || payload.salon_id.is_some() || payload.location.is_some() {
        let location = EventLocation::from_parts(payload.facility_id, payload.salon_id, payload.location)?;
        ensure_location_exists(&state, &location).await?;
        let (facility_id, salon_id, location) = location.into_columns();
        event.facility_id = facility_id;
        event.salon_id = salon_id;
        event.location = location;
    }

    if let Some(backup_id) = payload.backup_coach_id {
        if backup_id.is_empty() {
            event.backup_coach_id = None;
        } else {
            ensure_backup_coach(&state, &backup_id, &event.owner_id).await?;
            event.backup_coach_id = Some(backup_id);
        }
    }

    event.updated_at = state.clock.now();
    let updated = state.event_repo.update(&event).await?;
    info!(event_id = %updated.id, "Event updated");

    Ok(ApiResponse::ok(updated))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    ensure_owner(&user, &event)?;

    state.event_repo.delete(&event.id).await?;
    info!(event_id = %event.id, deleted_by = %user.id, "Event deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut event = load_event(&state, &event_id).await?;
    ensure_owner(&user, &event)?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("photo") {
            continue;
        }

        let extension = field.content_type()
            .and_then(image_extension)
            .ok_or(AppError::Validation("photo must be a jpeg, png or webp image".into()))?;

        let bytes = field.bytes().await
            .map_err(|e| AppError::Validation(format!("Could not read photo: {}", e)))?;

        upload = Some((extension, bytes));
        break;
    }

    let (extension, bytes) = upload.ok_or(AppError::Validation("Missing 'photo' field".into()))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("photo is empty".into()));
    }
    if bytes.len() > state.config.max_upload_bytes {
        warn!(event_id = %event.id, size = bytes.len(), "Rejected oversized photo");
        return Err(AppError::Validation(format!(
            "photo exceeds the {} byte limit", state.config.max_upload_bytes
        )));
    }

    let file_name = format!("{}-{}.{}", event.id, Uuid::new_v4().simple(), extension);
    let photo_url = state.photo_store.save(&file_name, &bytes).await?;

    event.photo_url = Some(photo_url);
    event.updated_at = state.clock.now();
    let updated = state.event_repo.update(&event).await?;

    info!(event_id = %updated.id, file = %file_name, "Event photo uploaded");
    Ok(ApiResponse::ok(updated))
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

async fn load_event(state: &AppState, event_id: &str) -> Result<Event, AppError> {
    state.event_repo.find_by_id(event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))
}

fn ensure_owner(user: &CurrentUser, event: &Event) -> Result<(), AppError> {
    if user.is_admin() || event.owner_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the event owner can change it".into()))
    }
}

async fn ensure_location_exists(state: &AppState, location: &EventLocation) -> Result<(), AppError> {
    if let EventLocation::Facility { facility_id, salon_id } = location {
        state.facility_repo.find_by_id(facility_id).await?
            .ok_or(AppError::Validation("facility_id does not exist".into()))?;

        let salon = state.facility_repo.find_salon(salon_id).await?
            .ok_or(AppError::Validation("salon_id does not exist".into()))?;

        if &salon.facility_id != facility_id {
            return Err(AppError::Validation("salon does not belong to the facility".into()));
        }
    }
    Ok(())
}

async fn ensure_backup_coach(state: &AppState, backup_id: &str, owner_id: &str) -> Result<(), AppError> {
    if backup_id == owner_id {
        return Err(AppError::Validation("backup coach must differ from the owner".into()));
    }
    let backup = state.user_repo.find_by_id(backup_id).await?
        .ok_or(AppError::Validation("backup_coach_id does not exist".into()))?;
    if backup.role != Role::Coach {
        return Err(AppError::Validation("backup coach must have the COACH role".into()));
    }
    Ok(())
}
