use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
};

use crate::auth::TokenService;
use crate::config::Settings;
use crate::middleware::{request_id_layer, trace_layer};
use crate::routes;
use crate::services::photos::{PhotoStore, UPLOADS_PREFIX};
use crate::store::Store;

/// Largest accepted request body (photo uploads included)
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub store: Store,
    pub tokens: TokenService,
    pub photos: PhotoStore,
}

impl AppState {
    pub fn new(settings: Settings, store: Store, tokens: TokenService, photos: PhotoStore) -> Arc<Self> {
        Arc::new(Self {
            settings,
            store,
            tokens,
            photos,
        })
    }

    /// Production deployments serve a cross-site frontend over HTTPS
    pub fn secure_cookies(&self) -> bool {
        self.settings.env.is_prod()
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);
    let (set_request_id, propagate_request_id) = request_id_layer();
    let uploads = ServeDir::new(state.photos.dir().clone());

    Router::new()
        .merge(routes::api_router())
        .nest_service(UPLOADS_PREFIX, uploads)
        // Middleware stack (applied bottom-up)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(propagate_request_id)
        .layer(trace_layer())
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // In dev mode, use longer preflight cache to reduce OPTIONS requests
    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    // Cookies are only sent cross-origin to allow-listed origins
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}
