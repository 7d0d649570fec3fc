use axum::{extract::State, http::StatusCode, response::IntoResponse};
use axum::Json;
use crate::api::dtos::{requests::{LoginRequest, RegisterRequest}, responses::ApiResponse};
use crate::api::extractors::auth::{AuthUser, CSRF_COOKIE};
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::models::{auth::{AuthResponse, IssuedTokens, UserProfile}, user::{Role, User}};
use std::sync::Arc;
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::SameSite;
use time::Duration;
use argon2::{password_hash::{SaltString, PasswordHasher}, PasswordHash, Argon2, PasswordVerifier};
use rand::rngs::OsRng;
use tracing::info;

pub const REFRESH_COOKIE: &str = "refresh_token";
const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!("Password must be at least {} characters", MIN_PASSWORD_LEN)));
    }
    if payload.display_name.trim().is_empty() {
        return Err(AppError::Validation("display_name is required".into()));
    }
    if payload.role == Role::Admin {
        return Err(AppError::Forbidden("ADMIN accounts cannot be self-registered".into()));
    }

    if state.user_repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|_| AppError::Internal)?
        .to_string();

    let user = User::new(email, password_hash, payload.role, payload.display_name.trim().to_string());
    let created = state.user_repo.create(&user).await?;

    info!(user_id = %created.id, role = %created.role, "User registered");

    Ok((StatusCode::CREATED, ApiResponse::ok(profile_of(&created))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let user = state.user_repo.find_by_email(&email).await?
        .ok_or(AppError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal)?;

    Argon2::default().verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized)?;

    let tokens = state.auth_service.login(&user).await?;
    set_cookies(&cookies, &tokens);

    info!("User logged in: {}", user.id);

    Ok(ApiResponse::ok(auth_response(tokens, &user)))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let refresh_cookie = cookies.get(REFRESH_COOKIE).ok_or(AppError::Unauthorized)?;
    let raw_token = refresh_cookie.value();

    let token_hash = state.auth_service.hash_token(raw_token);
    let record = state.auth_repo.find_refresh_token(&token_hash).await?
        .ok_or(AppError::Unauthorized)?;

    let user = state.user_repo.find_by_id(&record.user_id).await?
        .ok_or(AppError::Unauthorized)?;

    let tokens = state.auth_service.refresh(raw_token, &user).await?;
    set_cookies(&cookies, &tokens);

    info!("Token refreshed for user: {}", user.id);

    Ok(ApiResponse::ok(auth_response(tokens, &user)))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = cookies.get(REFRESH_COOKIE) {
        state.auth_service.logout(cookie.value()).await?;
    }

    cookies.remove(Cookie::build((REFRESH_COOKIE, "")).path("/").into());
    cookies.remove(Cookie::build((CSRF_COOKIE, "")).path("/").into());

    info!("User logged out");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(current): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_repo.find_by_id(&current.id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    Ok(ApiResponse::ok(profile_of(&user)))
}

fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        display_name: user.display_name.clone(),
    }
}

fn auth_response(tokens: IssuedTokens, user: &User) -> AuthResponse {
    AuthResponse {
        access_token: tokens.access_token,
        csrf_token: tokens.csrf_token,
        expires_in: tokens.expires_in,
        user: profile_of(user),
    }
}

fn set_cookies(cookies: &Cookies, tokens: &IssuedTokens) {
    let mut refresh_c = Cookie::new(REFRESH_COOKIE, tokens.refresh_token.clone());
    refresh_c.set_http_only(true);
    refresh_c.set_secure(true);
    refresh_c.set_same_site(SameSite::Strict);
    refresh_c.set_path("/");
    refresh_c.set_max_age(Duration::days(7));
    cookies.add(refresh_c);

    // Readable by scripts so the client can echo it in the CSRF header.
    let mut csrf_c = Cookie::new(CSRF_COOKIE, tokens.csrf_token.clone());
    csrf_c.set_secure(true);
    csrf_c.set_same_site(SameSite::Strict);
    csrf_c.set_path("/");
    csrf_c.set_max_age(Duration::days(7));
    cookies.add(csrf_c);
}
