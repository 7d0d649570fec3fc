pub mod session;

use std::sync::Arc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::dtos::responses::{CheckInResponse, EventPage, JoinResponse, PaymentResponse};
use crate::api::extractors::auth::CSRF_HEADER;
use crate::api::middleware::ACCESS_TOKEN_HEADER;
use crate::domain::models::auth::AuthResponse;
use crate::domain::ports::Clock;
use session::{RefreshPolicy, Session};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response carried no data")]
    EmptyResponse,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    message: Option<String>,
}

/// Query for `GET /events`; unset fields are left off the URL.
#[derive(Serialize, Default)]
pub struct EventQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upcoming: Option<bool>,
}

/// Typed HTTP client for the participant flow. Credentials are kept in a
/// [`Session`] that the caller owns and lends to each call.
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        clock: Arc<dyn Clock>,
        policy: RefreshPolicy,
    ) -> Result<Session, ClientError> {
        let response = self.http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let auth: AuthResponse = read_data(response).await?;
        Ok(Session::new(&auth, clock, policy))
    }

    /// Trades the refresh cookie for a new token pair.
    pub async fn refresh(&self, session: &mut Session) -> Result<(), ClientError> {
        let response = self.http
            .post(self.url("/auth/refresh"))
            .send()
            .await?;

        let auth: AuthResponse = read_data(response).await?;
        session.replace(&auth);
        debug!("Session refreshed");
        Ok(())
    }

    pub async fn make_reservation(&self, session: &mut Session, event_id: &str) -> Result<JoinResponse, ClientError> {
        let body = json!({ "event_id": event_id });
        self.send_authed(session, Method::POST, "/participant/make-reservation", |rb| rb.json(&body)).await
    }

    pub async fn confirm_payment(
        &self,
        session: &mut Session,
        event_id: &str,
        auto_check_in: bool,
    ) -> Result<PaymentResponse, ClientError> {
        let body = json!({ "event_id": event_id, "auto_check_in": auto_check_in });
        self.send_authed(session, Method::POST, "/participant/confirm-payment", |rb| rb.json(&body)).await
    }

    pub async fn check_in(&self, session: &mut Session, event_id: &str) -> Result<CheckInResponse, ClientError> {
        let body = json!({ "event_id": event_id });
        self.send_authed(session, Method::POST, "/participant/check-in", |rb| rb.json(&body)).await
    }

    pub async fn list_events(&self, query: &EventQuery) -> Result<EventPage, ClientError> {
        let response = self.http
            .get(self.url("/events"))
            .query(query)
            .send()
            .await?;
        read_data(response).await
    }

    async fn send_authed<T, F>(
        &self,
        session: &mut Session,
        method: Method,
        path: &str,
        build: F,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        if session.needs_refresh() {
            self.refresh(session).await?;
        }

        let request = self.http
            .request(method, self.url(path))
            .bearer_auth(session.access_token())
            .header(CSRF_HEADER, session.csrf_token());

        let response = build(request).send().await?;

        if let Some(rotated) = response.headers().get(ACCESS_TOKEN_HEADER) {
            match rotated.to_str() {
                Ok(token) => session.absorb_rotated(token),
                Err(_) => warn!("Ignoring non-ASCII rotated access token"),
            }
        }

        read_data(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Api { status: status.as_u16(), message });
    }

    let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
    envelope.data.ok_or(ClientError::EmptyResponse)
}
