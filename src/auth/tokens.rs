//! Session token issuing and verification (HS256)

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use super::Claims;
use crate::domain::normalize_email;

/// Cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Email is required to generate token")]
    MissingEmail,

    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("invalid or expired token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// Issues and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `email` (lowercased before embedding)
    pub fn issue(&self, email: &str) -> Result<String, TokenError> {
        let email = normalize_email(email).ok_or(TokenError::MissingEmail)?;
        let now = Utc::now();
        let claims = Claims {
            email,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Check signature and expiry and return the embedded claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

/// Http-only session cookie. Cross-site deployments (production) need
/// `Secure; SameSite=None`; local development uses `Lax`.
pub fn session_cookie(token: String, production: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(production)
        .same_site(same_site(production))
        .path("/")
        .build()
}

/// Expired, empty session cookie. Sent with `add` rather than relying on the
/// jar's removal so bearer-only clients get it too.
pub fn removal_cookie(production: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), production);
    cookie.make_removal();
    cookie
}

fn same_site(production: bool) -> SameSite {
    if production {
        SameSite::None
    } else {
        SameSite::Lax
    }
}
