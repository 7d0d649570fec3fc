mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Duration;
use common::{into_test_response, TestApp, PASSWORD};
use serde_json::json;
use tower::ServiceExt;

fn cookie_value(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers.get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find(|c| c.starts_with(&format!("{}=", name)))
        .map(|c| {
            let start = name.len() + 1;
            let end = c.find(';').unwrap_or(c.len());
            c[start..end].to_string()
        })
}

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new().await;

    let res = app.register("Runner@Example.com", "PARTICIPANT").await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["email"], "runner@example.com");
    assert_eq!(res.body["data"]["role"], "PARTICIPANT");
    assert!(res.body["data"].get("password_hash").is_none());

    let dup = app.register("runner@example.com", "COACH").await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let login = app.post("/auth/login", None, json!({
        "email": "runner@example.com",
        "password": PASSWORD,
    })).await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.body["data"]["access_token"].is_string());
    assert_eq!(login.body["data"]["expires_in"], 900);

    let refresh_cookie = login.headers.get_all(header::SET_COOKIE).iter()
        .filter_map(|h| h.to_str().ok())
        .find(|c| c.starts_with("refresh_token="))
        .expect("refresh cookie");
    assert!(refresh_cookie.contains("HttpOnly"));
    assert_eq!(
        cookie_value(&login.headers, "csrf_token").as_deref(),
        login.body["data"]["csrf_token"].as_str(),
    );

    let wrong = app.post("/auth/login", None, json!({
        "email": "runner@example.com",
        "password": "not-the-password",
    })).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["success"], false);
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;

    let short = app.post("/auth/register", None, json!({
        "email": "a@b.c", "password": "short", "display_name": "A", "role": "COACH",
    })).await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let bad_email = app.post("/auth/register", None, json!({
        "email": "not-an-email", "password": PASSWORD, "display_name": "A", "role": "COACH",
    })).await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let admin = app.register("sneaky@example.com", "ADMIN").await;
    assert_eq!(admin.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_me_and_rotated_access_token() {
    let app = TestApp::new().await;
    let coach = app.signup("COACH").await;

    let me = app.get("/auth/me", Some(&coach)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["id"], coach.user_id);

    let rotated = me.headers.get("x-access-token").expect("rotated token header");
    let rotated = rotated.to_str().unwrap().to_string();
    assert_ne!(rotated, coach.access_token);

    let mut next = coach.clone();
    next.access_token = rotated;
    let event_id = app.create_event(&next, Duration::days(4), json!({})).await;
    assert!(!event_id.is_empty());

    let anonymous = app.get("/events", None).await;
    assert!(anonymous.headers.get("x-access-token").is_none());

    let unauthenticated = app.get("/auth/me", None).await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_csrf_is_enforced_on_mutating_requests() {
    let app = TestApp::new().await;
    let coach = app.signup("COACH").await;

    let mut missing = coach.clone();
    missing.csrf_token = String::new();
    let res = app.post("/events", Some(&missing), json!({})).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let mut forged = coach.clone();
    forged.csrf_token = "forged".to_string();
    let res = app.post("/events", Some(&forged), json!({})).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let owner = app.signup("FACILITY").await;
    let create_facility = |cookie: Option<&'static str>| {
        let router = app.router.clone();
        let owner = owner.clone();
        async move {
            let mut builder = Request::builder()
                .method("POST")
                .uri("/facilities")
                .header(header::AUTHORIZATION, format!("Bearer {}", owner.access_token))
                .header("x-csrf-token", &owner.csrf_token)
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(cookie) = cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            let response = router.oneshot(
                builder.body(Body::from(json!({ "name": "X", "address": "Y" }).to_string())).unwrap()
            ).await.unwrap();
            into_test_response(response).await
        }
    };

    let stale_cookie = create_facility(Some("csrf_token=stale")).await;
    assert_eq!(stale_cookie.status, StatusCode::FORBIDDEN);

    let header_only = create_facility(None).await;
    assert_eq!(header_only.status, StatusCode::CREATED);

    let reads_skip_csrf = app.get("/auth/me", Some(&missing)).await;
    assert_eq!(reads_skip_csrf.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rotates_and_logout_revokes_family() {
    let app = TestApp::new().await;
    app.register("keeper@example.com", "PARTICIPANT").await;

    let login = app.post("/auth/login", None, json!({
        "email": "keeper@example.com",
        "password": PASSWORD,
    })).await;
    let first_refresh = cookie_value(&login.headers, "refresh_token").unwrap();

    let refresh = |token: String| {
        let router = app.router.clone();
        async move {
            let response = router.oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/refresh")
                    .header(header::COOKIE, format!("refresh_token={}", token))
                    .body(Body::empty())
                    .unwrap()
            ).await.unwrap();
            into_test_response(response).await
        }
    };

    let rotated = refresh(first_refresh.clone()).await;
    assert_eq!(rotated.status, StatusCode::OK);
    assert!(rotated.body["data"]["access_token"].is_string());
    let second_refresh = cookie_value(&rotated.headers, "refresh_token").unwrap();
    assert_ne!(first_refresh, second_refresh);

    let replay = refresh(first_refresh).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);

    let response = app.router.clone().oneshot(
        Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .header(header::COOKIE, format!("refresh_token={}", second_refresh))
            .body(Body::empty())
            .unwrap()
    ).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let after_logout = refresh(second_refresh).await;
    assert_eq!(after_logout.status, StatusCode::UNAUTHORIZED);
}
