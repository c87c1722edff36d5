//! Domain types and DTOs
//!
//! Documents stored in the Cart, Chef and Users collections plus the
//! request/response bodies of the routes that touch them.

pub mod auth;
pub mod items;
pub mod users;

pub use items::{Item, ItemKind, NewItem};
pub use users::{NewUser, Role, User};

/// Canonical form of an email address at every read and write boundary.
///
/// Lowercases and trims surrounding whitespace. Returns `None` for an empty
/// address so callers cannot accidentally store or match on `""`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        None
    } else {
        Some(email)
    }
}
