//! User routes
//!
//! Lookups by email are public. Profile sync needs a session for the same
//! email; listing, role changes and deletion need an admin session.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::{authorize, RequireAdmin, RequireAuth};
use crate::domain::users::{
    AdminStatusResponse, ProfileSyncRequest, ProfileSyncResponse, RoleChangeRequest,
    UpdatedResponse,
};
use crate::domain::{normalize_email, NewUser, Role, User};
use crate::error::ApiError;
use crate::routes::parse_id;
use crate::services::PhotoUpload;
use crate::store::{StoreError, UserFilter, UserPatch};

// ============================================================================
// Profile sync payload
// ============================================================================

/// Profile-sync submission: either a JSON body or a multipart form whose
/// optional `photo` part is an image file.
#[derive(Debug, Default)]
pub struct ProfileSubmission {
    pub profile: ProfileSyncRequest,
    pub photo: Option<PhotoUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for ProfileSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(profile) = Json::<ProfileSyncRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            return Ok(Self {
                profile,
                photo: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        let mut submission = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "photo" {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                // Browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    submission.photo = Some(PhotoUpload {
                        content_type,
                        bytes,
                    });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            let profile = &mut submission.profile;
            match name.as_str() {
                "uid" => profile.uid = Some(value),
                "email" => profile.email = Some(value),
                "name" => profile.name = Some(value),
                "photoURL" => profile.photo_url = Some(value).filter(|url| !url.is_empty()),
                _ => {}
            }
        }

        Ok(submission)
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// GET /users/admin/:email
pub async fn admin_status(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&email).ok_or_else(|| ApiError::not_found("User not found"))?;

    let user = state
        .store
        .users()
        .find_one(&UserFilter::by_email(email))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(AdminStatusResponse {
        admin: user.role == Role::Admin,
    }))
}

/// GET /users/:email
///
/// Exact-case lookup; stored emails are lowercase.
pub async fn get_user_exact(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .users()
        .find_one(&UserFilter::by_email(email))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user))
}

/// GET /get-user/:email
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::not_found("No user found with this email");
    let email = normalize_email(&email).ok_or_else(not_found)?;

    let user = state
        .store
        .users()
        .find_one(&UserFilter::by_email(email))
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(user))
}

/// GET /allusers
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.store.users().find_many(&UserFilter::default()).await?;
    Ok(Json(users))
}

// ============================================================================
// Profile sync
// ============================================================================

/// POST /users
///
/// Upsert by `uid`. An existing record must belong to the caller; it gets
/// its name, email and photo refreshed but keeps its role. A new record
/// starts as `user`.
pub async fn sync_user(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    submission: ProfileSubmission,
) -> Result<impl IntoResponse, ApiError> {
    let ProfileSubmission { profile, photo } = submission;

    let uid = profile
        .uid
        .as_deref()
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| ApiError::bad_request("uid is required"))?
        .to_string();
    let email = profile
        .email
        .as_deref()
        .and_then(normalize_email)
        .ok_or_else(|| ApiError::bad_request("email is required"))?;

    if !authorize(&auth.email, Some(email.as_str())).is_allowed() {
        return Err(ApiError::forbidden("Forbidden access"));
    }

    let users = state.store.users();
    let existing = users.find_one(&UserFilter::by_uid(uid.clone())).await?;
    if let Some(existing) = &existing {
        ensure_owner(&auth.email, existing)?;
    }

    let photo_url = match photo {
        Some(upload) => Some(state.photos.store(upload).await?),
        None => profile.photo_url,
    };
    let profile = SyncedProfile {
        email,
        name: profile.name.map(|name| name.trim().to_string()),
        photo_url,
    };

    if let Some(existing) = existing {
        return update_profile(&state, &auth.email, existing, profile).await;
    }

    let inserted = users
        .insert_one(NewUser {
            uid: uid.clone(),
            email: profile.email.clone(),
            name: profile.name.clone().unwrap_or_default(),
            photo_url: profile.photo_url.clone(),
            role: Role::User,
        })
        .await;

    let id = match inserted {
        Ok(id) => id,
        // Lost a race with a concurrent first sync for the same uid
        Err(StoreError::Conflict(_)) => {
            let existing = users
                .find_one(&UserFilter::by_uid(uid))
                .await?
                .ok_or_else(|| ApiError::internal("uid conflict without a matching user"))?;
            return update_profile(&state, &auth.email, existing, profile).await;
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(ProfileSyncResponse {
            success: true,
            message: "User created".to_string(),
            id,
            photo_url: profile.photo_url,
        }),
    ))
}

/// Normalized fields of a profile sync
struct SyncedProfile {
    email: String,
    name: Option<String>,
    photo_url: Option<String>,
}

/// A uid is public (every user lookup returns it), so knowing one never
/// proves ownership of the record.
fn ensure_owner(caller: &str, existing: &User) -> Result<(), ApiError> {
    if authorize(caller, Some(existing.email.as_str())).is_allowed() {
        return Ok(());
    }
    tracing::warn!(user_id = %existing.id, caller = %caller, "Profile sync for a record owned by someone else");
    Err(ApiError::forbidden("Forbidden access"))
}

async fn update_profile(
    state: &AppState,
    caller: &str,
    existing: User,
    profile: SyncedProfile,
) -> Result<(StatusCode, Json<ProfileSyncResponse>), ApiError> {
    ensure_owner(caller, &existing)?;

    state
        .store
        .users()
        .update_one(
            &UserFilter::by_id(existing.id),
            UserPatch::Profile {
                name: profile.name,
                email: Some(profile.email),
                photo_url: profile.photo_url.clone(),
            },
        )
        .await?;

    tracing::info!(user_id = %existing.id, "User profile updated");

    Ok((
        StatusCode::OK,
        Json(ProfileSyncResponse {
            success: true,
            message: "User updated".to_string(),
            id: existing.id,
            photo_url: profile.photo_url.or(existing.photo_url),
        }),
    ))
}

// ============================================================================
// Administration
// ============================================================================

/// PATCH /users/admin/:id
pub async fn make_admin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "User not found")?;
    set_role(&state, id, Role::Admin, &admin.email).await
}

/// PATCH /users/role/:id
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    admin: RequireAdmin,
    Json(req): Json<RoleChangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "User not found")?;
    let role: Role = req.role.trim().parse().map_err(ApiError::bad_request)?;
    set_role(&state, id, role, &admin.email).await
}

async fn set_role(
    state: &AppState,
    id: uuid::Uuid,
    role: Role,
    admin_email: &str,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let result = state
        .store
        .users()
        .update_one(&UserFilter::by_id(id), UserPatch::Role(role))
        .await?;

    if result.matched == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %id, role = %role, admin = %admin_email, "User role changed");

    Ok(Json(UpdatedResponse {
        matched_count: result.matched,
        modified_count: result.modified,
    }))
}

/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "User not found")?;

    let deleted = state.store.users().delete_one(&UserFilter::by_id(id)).await?;
    if deleted != 1 {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %id, admin = %admin.email, "User deleted");

    Ok(Json(serde_json::json!({ "deletedCount": deleted })))
}
