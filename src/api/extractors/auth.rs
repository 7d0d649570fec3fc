use axum::{
    extract::{FromRequestParts, FromRef},
    http::{header, request::Parts, HeaderMap, Method},
};
use crate::state::AppState;
use crate::domain::models::auth::CurrentUser;
use crate::error::AppError;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::Span;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_COOKIE: &str = "csrf_token";

pub struct AuthUser(pub CurrentUser);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let access_token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);
        let claims = app_state.auth_service.verify_access_token(access_token)?;

        if is_mutating(&parts.method) {
            let csrf_header_val = parts.headers.get(CSRF_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or(AppError::Forbidden("Missing CSRF token".into()))?;

            if csrf_header_val != claims.csrf {
                return Err(AppError::Forbidden("CSRF token mismatch".into()));
            }

            // Double submit: a csrf cookie, when the browser sends one, must agree too.
            if let Some(cookies) = parts.extensions.get::<Cookies>()
                && let Some(cookie) = cookies.get(CSRF_COOKIE)
                && cookie.value() != claims.csrf {
                return Err(AppError::Forbidden("CSRF token mismatch".into()));
            }
        }

        Span::current().record("user_id", claims.sub.as_str());
        Span::current().record("role", claims.role.as_str());

        Ok(AuthUser(CurrentUser {
            id: claims.sub,
            role: claims.role,
        }))
    }
}
