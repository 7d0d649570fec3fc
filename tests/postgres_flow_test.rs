mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use common::{into_test_response, AuthHeaders, TestResponse, PASSWORD};
use serde_json::{json, Value};
use sports_events_backend::{
    api::router::create_router,
    config::Config,
    domain::ports::SystemClock,
    infra::factory::{assemble_state, Repositories},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

async fn call(router: &Router, method: Method, uri: &str, auth: Option<&AuthHeaders>, body: Option<Value>) -> TestResponse {
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
    into_test_response(router.clone().oneshot(request).await.unwrap()).await
}

async fn signup(router: &Router, role: &str) -> AuthHeaders {
    let email = format!("{}-{}@pg.test", role.to_lowercase(), Uuid::new_v4().simple());
    let res = call(router, Method::POST, "/auth/register", None, Some(json!({
        "email": email,
        "password": PASSWORD,
        "display_name": role,
        "role": role,
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED, "register failed: {}", res.body);

    let res = call(router, Method::POST, "/auth/login", None, Some(json!({
        "email": email,
        "password": PASSWORD,
    }))).await;
    assert_eq!(res.status, StatusCode::OK);
    AuthHeaders {
        user_id: res.body["data"]["user"]["id"].as_str().unwrap().to_string(),
        access_token: res.body["data"]["access_token"].as_str().unwrap().to_string(),
        csrf_token: res.body["data"]["csrf_token"].as_str().unwrap().to_string(),
    }
}

#[tokio::test]
async fn test_participant_flow_on_postgres() {
    let Ok(db_url) = std::env::var("DATABASE_URL") else {
        println!("Skipping Postgres flow test (DATABASE_URL not set)");
        return;
    };
    if !db_url.starts_with("postgres") {
        println!("Skipping Postgres flow test (not targeting Postgres)");
        return;
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to DB");
    sqlx::migrate!("./migrations/postgres").run(&pool).await.expect("Failed to migrate");

    let upload_dir = format!("test_uploads_{}", Uuid::new_v4());
    let config = Config {
        database_url: db_url.clone(),
        port: 0,
        jwt_secret_key: include_str!("../tests/keys/test_private.pem").to_string(),
        jwt_public_key: include_str!("../tests/keys/test_public.pem").to_string(),
        auth_issuer: "test-issuer".to_string(),
        upload_dir: upload_dir.clone(),
        public_assets_base_url: "/uploads".to_string(),
        max_upload_bytes: 64 * 1024,
        admin_email: None,
        admin_password: None,
    };
    let state = assemble_state(&config, Repositories::postgres(pool.clone()), Arc::new(SystemClock))
        .expect("Failed to assemble state");
    let router = create_router(Arc::new(state));

    let coach = signup(&router, "COACH").await;
    let participant = signup(&router, "PARTICIPANT").await;

    let res = call(&router, Method::PUT, "/participant/profile", Some(&participant), Some(json!({
        "first_name": "Pia",
        "last_name": "Gres",
    }))).await;
    assert_eq!(res.status, StatusCode::OK, "profile upsert failed: {}", res.body);
    let res = call(&router, Method::GET, "/participant/profile", Some(&participant), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["first_name"], "Pia");

    let title = format!("PG 100% Match {}", Uuid::new_v4().simple());
    let start = Utc::now() + Duration::days(7);
    let res = call(&router, Method::POST, "/events", Some(&coach), Some(json!({
        "title": title,
        "sport": "football",
        "start_time": start.to_rfc3339(),
        "end_time": (start + Duration::hours(2)).to_rfc3339(),
        "capacity": 2,
        "price_type": "STABLE",
        "participation_fee": "15",
        "location": "Riverside Field",
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED, "event creation failed: {}", res.body);
    let event_id = res.body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/events/{}", event_id);

    let res = call(&router, Method::GET, &uri, None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["participation_fee"], "15.00");

    let res = call(&router, Method::GET, &format!("/events?owner_id={}&q=100%25", coach.user_id), None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["total"], 1);

    let res = call(&router, Method::POST, "/participant/make-reservation", Some(&participant), Some(json!({
        "event_id": event_id,
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED, "join failed: {}", res.body);
    assert_eq!(res.body["data"]["reservation"]["is_wait_listed"], false);

    let res = call(&router, Method::PUT, &uri, Some(&coach), Some(json!({ "capacity": 1 }))).await;
    assert_eq!(res.status, StatusCode::OK, "capacity update failed: {}", res.body);

    let res = call(&router, Method::POST, "/participant/confirm-payment", Some(&participant), Some(json!({
        "event_id": event_id,
    }))).await;
    assert_eq!(res.status, StatusCode::OK, "payment failed: {}", res.body);
    assert_eq!(res.body["data"]["reservation"]["is_paid"], true);

    let res = call(&router, Method::POST, "/participant/check-in", Some(&participant), Some(json!({
        "event_id": event_id,
    }))).await;
    assert_eq!(res.status, StatusCode::OK, "check-in failed: {}", res.body);
    assert_eq!(res.body["data"]["checked_in"], true);

    let res = call(&router, Method::DELETE, &uri, Some(&coach), None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(call(&router, Method::GET, &uri, None, None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(call(&router, Method::DELETE, &uri, Some(&coach), None).await.status, StatusCode::NOT_FOUND);

    let _ = std::fs::remove_dir_all(&upload_dir);
}
