//! Service layer modules for external collaborators.
//!
//! Currently only photo storage for the profile-sync route.

pub mod photos;

pub use photos::{PhotoStore, PhotoUpload};
