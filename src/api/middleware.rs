use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use crate::api::extractors::auth::bearer_token;
use crate::state::AppState;

/// Response header carrying the rotated access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Every call made with a valid bearer token gets a fresh one back, so an
/// active client never sees its token expire mid-session.
pub async fn rotate_access_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let claims = bearer_token(request.headers())
        .and_then(|token| state.auth_service.verify_access_token(token).ok());

    let mut response = next.run(request).await;

    if let Some(claims) = claims {
        match state.auth_service.rotate_access_token(&claims) {
            Ok(token) => match HeaderValue::from_str(&token) {
                Ok(value) => {
                    response.headers_mut().insert(ACCESS_TOKEN_HEADER, value);
                }
                Err(e) => warn!("Rotated token is not a valid header value: {}", e),
            },
            Err(e) => warn!("Access token rotation failed: {}", e),
        }
    }

    response
}
