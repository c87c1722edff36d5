//! Cart and chef-recommendation routes
//!
//! Both collections share these handlers; the `Collection` marker picks the
//! store and the duplicate-name policy. Every route requires a session and
//! every query is scoped to the caller's email, so another user's item looks
//! exactly like a missing one.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::{authorize, RequireAuth};
use crate::domain::items::{
    Collection, CreateItemRequest, DeletedResponse, InsertedResponse, ItemListQuery, QuantityResponse,
};
use crate::domain::{normalize_email, NewItem};
use crate::error::ApiError;
use crate::routes::parse_id;
use crate::store::{ItemFilter, ItemPatch};

const NOT_FOUND: &str = "Item not found or unauthorized";

/// Largest quantity an item can hold (the column is a 32-bit integer)
pub const MAX_QUANTITY: i32 = i32::MAX;

/// GET /<collection>?email=
///
/// List the caller's items. The query email must be the caller's own.
pub async fn list_items<C: Collection>(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemListQuery>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let requested = query.email.as_deref().and_then(normalize_email);
    if !authorize(&auth.email, requested.as_deref()).is_allowed() {
        return Err(ApiError::forbidden("Forbidden access"));
    }

    let items = state
        .store
        .items(C::KIND)
        .find_many(&ItemFilter::owned_by(auth.email.clone()))
        .await?;

    Ok(Json(items))
}

/// POST /<collection>
///
/// Insert an item owned by the caller.
pub async fn create_item<C: Collection>(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(mut req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = req.user_email.as_deref().and_then(normalize_email);
    if !authorize(&auth.email, owner.as_deref()).is_allowed() {
        return Err(ApiError::forbidden("Unauthorized access"));
    }

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("Item name is required"))?
        .to_string();

    let quantity = match req.quantity {
        None => 1,
        Some(q) if q >= 1 => {
            i32::try_from(q).map_err(|_| ApiError::bad_request("Quantity is too large"))?
        }
        Some(_) => return Err(ApiError::bad_request("Quantity must be at least 1")),
    };

    let collection = state.store.items(C::KIND);

    if C::KIND.rejects_duplicate_names() {
        let existing = collection
            .find_one(&ItemFilter::owned_by(auth.email.clone()).name(name.clone()))
            .await?;
        if existing.is_some() {
            return Err(ApiError::bad_request("Item already exists in your list"));
        }
    }

    let extra = req.take_extra();
    let id = collection
        .insert_one(NewItem {
            user_email: auth.email.clone(),
            name,
            quantity,
            extra,
        })
        .await?;

    tracing::info!(collection = %C::KIND, item_id = %id, "Item created");

    Ok(Json(InsertedResponse {
        acknowledged: true,
        inserted_id: id,
    }))
}

/// PATCH /<collection>/increase/:id
///
/// Mirror of the decrease: "increment where quantity < MAX", then tell a
/// missing item from one at the ceiling.
pub async fn increase_quantity<C: Collection>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let collection = state.store.items(C::KIND);
    let scoped = ItemFilter::owned_by(auth.email.clone()).id(id);

    let result = collection
        .update_one(&scoped.clone().quantity_lt(MAX_QUANTITY), ItemPatch::IncQuantity(1))
        .await?;

    if result.matched == 0 {
        return match collection.find_one(&scoped).await? {
            Some(_) => Err(ApiError::bad_request(format!(
                "Quantity cannot exceed {}",
                MAX_QUANTITY
            ))),
            None => Err(ApiError::not_found(NOT_FOUND)),
        };
    }

    Ok(Json(QuantityResponse {
        message: "Quantity increased".to_string(),
        modified_count: result.modified,
    }))
}

/// PATCH /<collection>/decrease/:id
///
/// One conditional update ("decrement where quantity > 1"); only when it
/// matches nothing do we look again to tell a missing item from one at the
/// floor.
pub async fn decrease_quantity<C: Collection>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let collection = state.store.items(C::KIND);
    let scoped = ItemFilter::owned_by(auth.email.clone()).id(id);

    let result = collection
        .update_one(&scoped.clone().quantity_gt(1), ItemPatch::IncQuantity(-1))
        .await?;

    if result.matched == 0 {
        return match collection.find_one(&scoped).await? {
            Some(_) => Err(ApiError::bad_request("Quantity cannot be less than 1")),
            None => Err(ApiError::not_found(NOT_FOUND)),
        };
    }

    Ok(Json(QuantityResponse {
        message: "Quantity decreased".to_string(),
        modified_count: result.modified,
    }))
}

/// DELETE /<collection>/:id
pub async fn delete_item<C: Collection>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;

    let deleted = state
        .store
        .items(C::KIND)
        .delete_one(&ItemFilter::owned_by(auth.email.clone()).id(id))
        .await?;

    if deleted != 1 {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    tracing::info!(collection = %C::KIND, item_id = %id, "Item removed");

    Ok(Json(DeletedResponse {
        success: true,
        message: "Item removed".to_string(),
        deleted_count: deleted,
    }))
}
