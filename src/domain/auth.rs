//! Session token request and response bodies

use serde::{Deserialize, Serialize};

/// POST /jwt body
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /jwt response; the token is also set as an http-only cookie
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

/// POST /logout response
#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}
