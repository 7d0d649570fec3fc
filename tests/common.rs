use sports_events_backend::{
    api::router::create_router,
    config::Config,
    domain::ports::{Clock, SystemClock},
    infra::factory::{assemble_state, seed_admin, Repositories},
    state::AppState,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use tower::ServiceExt;
use serde_json::{json, Value};

pub const ADMIN_EMAIL: &str = "admin@sports.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

/// Clock the tests can move by hand.
pub struct FixedClock(Mutex<DateTime<Utc>>);

#[allow(dead_code)]
impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Clone)]
pub struct AuthHeaders {
    pub user_id: String,
    pub access_token: String,
    pub csrf_token: String,
}

#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub upload_dir: String,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock)).await
    }

    pub async fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);
        let upload_dir = format!("test_uploads_{}", Uuid::new_v4());

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            jwt_secret_key: priv_key_pem.to_string(),
            jwt_public_key: pub_key_pem.to_string(),
            auth_issuer: "test-issuer".to_string(),
            upload_dir: upload_dir.clone(),
            public_assets_base_url: "/uploads".to_string(),
            max_upload_bytes: 64 * 1024,
            admin_email: Some(ADMIN_EMAIL.to_string()),
            admin_password: Some(ADMIN_PASSWORD.to_string()),
        };

        let state = assemble_state(&config, Repositories::sqlite(pool.clone()), clock)
            .expect("Failed to assemble state");
        seed_admin(&state, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("Failed to seed admin");

        let state = Arc::new(state);
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            upload_dir,
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&AuthHeaders>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::AUTHORIZATION, format!("Bearer {}", auth.access_token))
                .header("x-csrf-token", &auth.csrf_token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        into_test_response(response).await
    }

    pub async fn get(&self, uri: &str, auth: Option<&AuthHeaders>) -> TestResponse {
        self.request(Method::GET, uri, auth, None).await
    }

    pub async fn post(&self, uri: &str, auth: Option<&AuthHeaders>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, auth, Some(body)).await
    }

    pub async fn register(&self, email: &str, role: &str) -> TestResponse {
        self.post("/auth/register", None, json!({
            "email": email,
            "password": PASSWORD,
            "display_name": email.split('@').next().unwrap_or("user"),
            "role": role,
        })).await
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthHeaders {
        let response = self.post("/auth/login", None, json!({
            "email": email,
            "password": password,
        })).await;

        if !response.status.is_success() {
            panic!("Login failed in test helper: status {}", response.status);
        }

        AuthHeaders {
            user_id: response.body["data"]["user"]["id"].as_str().unwrap().to_string(),
            access_token: response.body["data"]["access_token"].as_str().unwrap().to_string(),
            csrf_token: response.body["data"]["csrf_token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn admin(&self) -> AuthHeaders {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a fresh account with `role` and signs it in.
    pub async fn signup(&self, role: &str) -> AuthHeaders {
        let email = format!("{}-{}@sports.test", role.to_lowercase(), Uuid::new_v4().simple());
        let response = self.register(&email, role).await;
        assert_eq!(response.status, StatusCode::CREATED, "register failed: {}", response.body);
        self.login(&email, PASSWORD).await
    }

    /// A participant with a profile, ready to join events.
    pub async fn participant(&self) -> AuthHeaders {
        let auth = self.signup("PARTICIPANT").await;
        let response = self.request(Method::PUT, "/participant/profile", Some(&auth), Some(json!({
            "first_name": "Pat",
            "last_name": "Runner",
        }))).await;
        assert_eq!(response.status, StatusCode::OK, "profile failed: {}", response.body);
        auth
    }

    /// Creates an event starting `starts_in` from the app clock, with
    /// `overrides` merged over a free, address-located default.
    pub async fn create_event(&self, coach: &AuthHeaders, starts_in: Duration, overrides: Value) -> String {
        let start = self.state.clock.now() + starts_in;
        let mut payload = json!({
            "title": "Sunday Football",
            "sport": "football",
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::hours(2)).to_rfc3339(),
            "capacity": 10,
            "price_type": "FREE",
            "location": "Central Park Pitch 3",
        });
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), overrides.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }

        let response = self.post("/events", Some(coach), payload).await;
        assert_eq!(response.status, StatusCode::CREATED, "event creation failed: {}", response.body);
        response.body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn join(&self, participant: &AuthHeaders, event_id: &str) -> TestResponse {
        self.post("/participant/make-reservation", Some(participant), json!({ "event_id": event_id })).await
    }
}

#[allow(dead_code)]
pub async fn into_test_response(response: axum::response::Response) -> TestResponse {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse { status, headers, body }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}
