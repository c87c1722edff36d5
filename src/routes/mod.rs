pub mod auth;
pub mod health;
pub mod items;
pub mod users;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::domain::items::{Cart, Chef, Collection};
use crate::error::ApiError;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    let router = Router::new()
        // Public routes
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        // Session tokens
        .route("/jwt", post(auth::issue_token))
        .route("/logout", post(auth::logout))
        // Users. GET takes an email and PATCH/DELETE a record id in the same
        // path segment, hence the neutral `:key`.
        .route("/users", post(users::sync_user))
        .route("/allusers", get(users::list_users))
        .route(
            "/users/admin/:key",
            get(users::admin_status).patch(users::make_admin),
        )
        .route("/users/role/:key", patch(users::change_role))
        .route(
            "/users/:key",
            get(users::get_user_exact).delete(users::delete_user),
        )
        .route("/get-user/:email", get(users::get_user));

    // Cart and chef recommendations share one set of handlers
    let router = item_routes::<Cart>(router);
    item_routes::<Chef>(router)
}

fn item_routes<C: Collection>(router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    let base = format!("/{}", C::KIND.path());

    router
        .route(&base, get(items::list_items::<C>).post(items::create_item::<C>))
        .route(&format!("{}/increase/:id", base), patch(items::increase_quantity::<C>))
        .route(&format!("{}/decrease/:id", base), patch(items::decrease_quantity::<C>))
        .route(&format!("{}/:id", base), delete(items::delete_item::<C>))
}

/// Document ids in paths. A malformed id can never match a document, so it
/// gets the same 404 as an unknown one.
pub(crate) fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(not_found))
}
