//! Shared harness: the real router over an in-memory store, driven with
//! `tower::ServiceExt::oneshot` so no socket or database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use bistro_boss_backend::{
    app::{self, AppState},
    auth::TokenService,
    config::{Environment, LogFormat, Settings},
    domain::{NewUser, Role},
    services::PhotoStore,
    store::Store,
};

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_in(Environment::Dev)
}

pub fn spawn_app_in(env: Environment) -> TestApp {
    let upload_dir = std::env::temp_dir().join(format!("bistro-test-{}", Uuid::new_v4()));
    let settings = Settings {
        log_format: LogFormat::resolve(None, &env),
        env,
        server_addr: "127.0.0.1:0".to_string(),
        database_url: None,
        database_max_connections: 1,
        cors_allow_origins: vec!["http://localhost:5173".to_string()],
        jwt_secret: SECRET.to_string(),
        jwt_ttl_seconds: 3600,
        upload_dir: upload_dir.clone(),
        public_base_url: "http://localhost:5000".to_string(),
    };

    let tokens = TokenService::new(SECRET, chrono::Duration::seconds(settings.jwt_ttl_seconds));
    let photos = PhotoStore::new(upload_dir, &settings.public_base_url).expect("valid base url");
    let state = AppState::new(settings, Store::in_memory(), tokens, photos);

    TestApp {
        router: app::create_app(state.clone()),
        state,
    }
}

impl TestApp {
    pub fn token_for(&self, email: &str) -> String {
        self.state.tokens.issue(email).expect("token issued")
    }

    /// Insert a user record directly, bypassing the routes
    pub async fn seed_user(&self, uid: &str, email: &str, role: Role) -> Uuid {
        self.state
            .store
            .users()
            .insert_one(NewUser {
                uid: uid.to_string(),
                email: email.to_string(),
                name: uid.to_string(),
                photo_url: None,
                role,
            })
            .await
            .expect("user inserted")
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build(Method::GET, uri, token, None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(build(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.send(build(Method::PATCH, uri, token, body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build(Method::DELETE, uri, token, None)).await
    }
}

pub fn build(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

/// Hand-rolled multipart body: text fields plus an optional file part
pub fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    const BOUNDARY: &str = "bistro-test-boundary";
    let mut body: Vec<u8> = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"photo\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("valid request")
}
