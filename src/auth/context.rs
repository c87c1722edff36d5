use super::Claims;

/// Authenticated caller, rebuilt from the token on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Claim email, already lowercase
    pub email: String,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            email: claims.email,
        }
    }
}
