//! Ownership guard

/// Outcome of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Allow only when the resource's declared owner is the caller.
///
/// Both sides must already be normalized; the comparison is exact. An
/// absent owner is always denied.
pub fn authorize(claim_email: &str, owner_email: Option<&str>) -> Access {
    match owner_email {
        Some(owner) if owner == claim_email => Access::Allow,
        _ => Access::Deny,
    }
}
