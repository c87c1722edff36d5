mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use bistro_boss_backend::{auth::TokenService, config::Environment};
use serde_json::json;

use common::{spawn_app, spawn_app_in, SECRET};

#[tokio::test]
async fn root_and_health_respond() {
    let app = spawn_app();

    let root = app.get("/", None).await;
    assert_eq!(root.status, StatusCode::OK);
    assert_eq!(root.body, json!("Bistro boss running!"));

    let health = app.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");
    assert_eq!(health.body["services"]["backend"], "memory");
}

#[tokio::test]
async fn issued_token_is_returned_and_set_as_cookie() {
    let app = spawn_app();

    let res = app.post_json("/jwt", None, json!({ "email": "Bob@X.com" })).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    let token = res.body["token"].as_str().expect("token in body");
    assert_eq!(app.state.tokens.verify(token).unwrap().email, "bob@x.com");

    let cookie = res
        .set_cookies()
        .into_iter()
        .find(|c| c.starts_with("token="))
        .expect("session cookie set");
    assert!(cookie.contains(token));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn production_cookie_is_secure_and_cross_site() {
    let app = spawn_app_in(Environment::Prod);

    let res = app.post_json("/jwt", None, json!({ "email": "bob@x.com" })).await;

    let cookie = res.set_cookies().join("; ");
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=None"));
}

#[tokio::test]
async fn token_request_without_email_is_rejected() {
    let app = spawn_app();

    let res = app.post_json("/jwt", None, json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    assert!(res.set_cookies().is_empty());

    let blank = app.post_json("/jwt", None, json!({ "email": "" })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let app = spawn_app();

    let res = app.get("/cart?email=bob@x.com", None).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Unauthorized access - No token");
}

#[tokio::test]
async fn forged_token_is_401() {
    let app = spawn_app();
    let forged = TokenService::new("not-the-secret", chrono::Duration::hours(1))
        .issue("bob@x.com")
        .unwrap();

    let res = app.get("/cart?email=bob@x.com", Some(&forged)).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Unauthorized access - Invalid token");
}

#[tokio::test]
async fn expired_token_is_401() {
    let app = spawn_app();
    let expired = TokenService::new(SECRET, chrono::Duration::seconds(-10))
        .issue("bob@x.com")
        .unwrap();

    let res = app.get("/cart?email=bob@x.com", Some(&expired)).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cookie_token_authenticates() {
    let app = spawn_app();
    let token = app.token_for("bob@x.com");

    let req = Request::builder()
        .method(Method::GET)
        .uri("/cart?email=bob@x.com")
        .header(header::COOKIE, format!("token={}", token))
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!([]));
}

#[tokio::test]
async fn bearer_header_is_checked_before_cookie() {
    let app = spawn_app();
    let bob = app.token_for("bob@x.com");

    let req = Request::builder()
        .method(Method::GET)
        .uri("/cart?email=bob@x.com")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .header(header::COOKIE, format!("token={}", bob))
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = spawn_app();

    let res = app.post_json("/logout", None, json!({})).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    let cookie = res
        .set_cookies()
        .into_iter()
        .find(|c| c.starts_with("token="))
        .expect("removal cookie set");
    assert!(cookie.contains("Max-Age=0"));
}
