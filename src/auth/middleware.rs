use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use super::{AuthContext, TOKEN_COOKIE};
use crate::app::AppState;
use crate::domain::Role;
use crate::error::{ApiError, ErrorResponse};
use crate::store::UserFilter;

/// Extractor that requires a valid session token
/// Use this in route handlers to require a signed-in caller
///
/// Example:
/// ```ignore
/// async fn protected_route(auth: RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}", auth.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl std::ops::Deref for RequireAuth {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::MissingToken => "Unauthorized access - No token",
            AuthError::InvalidToken(_) => "Unauthorized access - Invalid token",
        };

        let body = ErrorResponse::new("UNAUTHORIZED", message);
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Locate the session token: a non-empty `Authorization: Bearer` value wins,
/// otherwise the http-only session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(AuthError::MissingToken)?;

        let claims = state.tokens.verify(&token).map_err(|e| {
            tracing::warn!(error = %e, "Session token verification failed");
            AuthError::InvalidToken(e.to_string())
        })?;

        Ok(RequireAuth(AuthContext::from_claims(claims)))
    }
}

/// Extractor that requires an authenticated caller whose user record has
/// `role = admin`.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub RequireAuth);

impl std::ops::Deref for RequireAdmin {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &(self.0).0
    }
}

#[derive(Debug)]
pub enum AdminAuthError {
    NotAuthenticated(AuthError),
    NotAdmin,
    Store(ApiError),
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        match self {
            AdminAuthError::NotAuthenticated(e) => e.into_response(),
            AdminAuthError::NotAdmin => (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("FORBIDDEN", "Admin privileges required")),
            )
                .into_response(),
            AdminAuthError::Store(e) => e.into_response(),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // First, require authentication
        let auth = RequireAuth::from_request_parts(parts, state)
            .await
            .map_err(AdminAuthError::NotAuthenticated)?;

        let user = state
            .store
            .users()
            .find_one(&UserFilter::by_email(auth.email.clone()))
            .await
            .map_err(|e| AdminAuthError::Store(e.into()))?;

        if user.map(|u| u.role) != Some(Role::Admin) {
            tracing::warn!(email = %auth.email, "Non-admin user attempted to access admin route");
            return Err(AdminAuthError::NotAdmin);
        }

        Ok(RequireAdmin(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_bearer_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token="));
        assert_eq!(extract_token(&headers), None);
    }
}
