//! Cart and chef-recommendation items
//!
//! Both collections hold structurally identical documents. They differ only
//! in whether a user may hold two items with the same name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Which item collection a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Cart,
    Chef,
}

impl ItemKind {
    /// URL segment and log label
    pub fn path(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Chef => "chef",
        }
    }

    /// The chef list keeps one entry per (owner, name); the cart allows repeats.
    pub fn rejects_duplicate_names(self) -> bool {
        matches!(self, Self::Chef)
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Marker types so route handlers can be written once and mounted per collection
pub trait Collection: Send + Sync + 'static {
    const KIND: ItemKind;
}

pub struct Cart;
pub struct Chef;

impl Collection for Cart {
    const KIND: ItemKind = ItemKind::Cart;
}

impl Collection for Chef {
    const KIND: ItemKind = ItemKind::Chef;
}

/// Stored item document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_email: String,
    pub name: String,
    pub quantity: i32,
    /// Fields the backend does not interpret (price, image, recipe, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated item ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub user_email: String,
    pub name: String,
    pub quantity: i32,
    pub extra: Map<String, Value>,
}

impl NewItem {
    pub fn into_item(self, id: Uuid) -> Item {
        Item {
            id,
            user_email: self.user_email,
            name: self.name,
            quantity: self.quantity,
            extra: self.extra,
        }
    }
}

/// POST body for `/cart` and `/chef`
///
/// Every field is optional at the serde level so the handler can answer
/// with the right status (403 for a missing owner, 400 for a missing name)
/// instead of a generic deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreateItemRequest {
    /// Client-supplied ids are ignored; the store assigns them.
    pub fn take_extra(&mut self) -> Map<String, Value> {
        let mut extra = std::mem::take(&mut self.extra);
        extra.remove("_id");
        extra.remove("id");
        extra
    }
}

/// Query string for the list endpoints
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ItemListQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedResponse {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityResponse {
    pub message: String,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: u64,
}
