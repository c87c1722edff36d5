//! Session token routes
//!
//! Tokens are handed out as an http-only cookie and echoed in the body for
//! clients that prefer an `Authorization: Bearer` header.

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::tokens::{removal_cookie, session_cookie};
use crate::auth::TokenError;
use crate::domain::auth::{LogoutResponse, TokenRequest, TokenResponse};
use crate::error::ApiError;

/// POST /jwt
///
/// Issue a session token for `{email}`.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Option<Json<TokenRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.and_then(|Json(req)| req.email).unwrap_or_default();

    let token = state.tokens.issue(&email).map_err(|e| match e {
        TokenError::MissingEmail => ApiError::bad_request("Email is required to generate token"),
        other => ApiError::Internal(anyhow::Error::new(other).context("Failed to generate token")),
    })?;

    tracing::info!(ttl_secs = state.tokens.ttl().num_seconds(), "Issued session token");

    let jar = jar.add(session_cookie(token.clone(), state.secure_cookies()));
    Ok((
        jar,
        Json(TokenResponse {
            success: true,
            message: "Token issued successfully".to_string(),
            token,
        }),
    ))
}

/// POST /logout
///
/// Tokens are stateless; logging out only clears the cookie.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(removal_cookie(state.secure_cookies()));
    (
        jar,
        Json(LogoutResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    )
}
