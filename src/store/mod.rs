//! Collection gateway
//!
//! A thin CRUD facade over the Cart, Chef and Users collections. Route
//! handlers only ever issue one of `find_many`, `find_one`, `insert_one`,
//! `update_one` or `delete_one` per request step; validation is theirs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Item, ItemKind, NewItem, NewUser, Role, User};

pub use memory::{MemoryItems, MemoryUsers};
pub use postgres::{PgItems, PgUsers};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt document: {0}")]
    Corrupt(String),

    /// A unique key (user `uid`) is already taken
    #[error("duplicate key: {0}")]
    Conflict(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of `update_one`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// Conjunction of equality predicates over an item document.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub id: Option<Uuid>,
    pub user_email: Option<String>,
    pub name: Option<String>,
    /// `quantity > n`
    pub quantity_gt: Option<i32>,
    /// `quantity < n`
    pub quantity_lt: Option<i32>,
}

impl ItemFilter {
    pub fn owned_by(email: impl Into<String>) -> Self {
        Self {
            user_email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn quantity_gt(mut self, floor: i32) -> Self {
        self.quantity_gt = Some(floor);
        self
    }

    pub fn quantity_lt(mut self, ceiling: i32) -> Self {
        self.quantity_lt = Some(ceiling);
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.id.map_or(true, |id| item.id == id)
            && self
                .user_email
                .as_deref()
                .map_or(true, |email| item.user_email == email)
            && self.name.as_deref().map_or(true, |name| item.name == name)
            && self.quantity_gt.map_or(true, |floor| item.quantity > floor)
            && self.quantity_lt.map_or(true, |ceiling| item.quantity < ceiling)
    }
}

/// Mutations supported on items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPatch {
    /// Numeric increment of `quantity` (negative to decrement)
    IncQuantity(i32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub uid: Option<String>,
    pub email: Option<String>,
}

impl UserFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.id.map_or(true, |id| user.id == id)
            && self.uid.as_deref().map_or(true, |uid| user.uid == uid)
            && self.email.as_deref().map_or(true, |email| user.email == email)
    }
}

/// Field-set mutations supported on users
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPatch {
    /// Profile sync; `None` leaves a field untouched. Never touches `role`.
    Profile {
        name: Option<String>,
        email: Option<String>,
        photo_url: Option<String>,
    },
    /// Explicit role change
    Role(Role),
}

#[async_trait]
pub trait ItemCollection: Send + Sync {
    async fn find_many(&self, filter: &ItemFilter) -> StoreResult<Vec<Item>>;
    async fn find_one(&self, filter: &ItemFilter) -> StoreResult<Option<Item>>;
    async fn insert_one(&self, item: NewItem) -> StoreResult<Uuid>;
    async fn update_one(&self, filter: &ItemFilter, patch: ItemPatch) -> StoreResult<UpdateResult>;
    async fn delete_one(&self, filter: &ItemFilter) -> StoreResult<u64>;
}

#[async_trait]
pub trait UserCollection: Send + Sync {
    async fn find_many(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;
    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<User>>;
    async fn insert_one(&self, user: NewUser) -> StoreResult<Uuid>;
    async fn update_one(&self, filter: &UserFilter, patch: UserPatch) -> StoreResult<UpdateResult>;
    async fn delete_one(&self, filter: &UserFilter) -> StoreResult<u64>;
}

/// Handle to the three collections, acquired once at startup and shared by
/// every request through `AppState`.
#[derive(Clone)]
pub struct Store {
    cart: Arc<dyn ItemCollection>,
    chef: Arc<dyn ItemCollection>,
    users: Arc<dyn UserCollection>,
    pool: Option<PgPool>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            cart: Arc::new(PgItems::new(pool.clone(), ItemKind::Cart)),
            chef: Arc::new(PgItems::new(pool.clone(), ItemKind::Chef)),
            users: Arc::new(PgUsers::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            cart: Arc::new(MemoryItems::default()),
            chef: Arc::new(MemoryItems::default()),
            users: Arc::new(MemoryUsers::default()),
            pool: None,
        }
    }

    pub fn items(&self, kind: ItemKind) -> &dyn ItemCollection {
        match kind {
            ItemKind::Cart => self.cart.as_ref(),
            ItemKind::Chef => self.chef.as_ref(),
        }
    }

    pub fn users(&self) -> &dyn UserCollection {
        self.users.as_ref()
    }

    pub fn backend(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    pub async fn health_check(&self) -> bool {
        match &self.pool {
            Some(pool) => crate::db::health_check(pool).await,
            None => true,
        }
    }

    /// Release the underlying connections
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("Database connection pool closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn item(email: &str, name: &str, quantity: i32) -> Item {
        Item {
            id: Uuid::new_v4(),
            user_email: email.to_string(),
            name: name.to_string(),
            quantity,
            extra: Map::new(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(ItemFilter::default().matches(&item("a@x.com", "Soup", 1)));
    }

    #[test]
    fn filter_is_a_conjunction() {
        let soup = item("a@x.com", "Soup", 2);
        let filter = ItemFilter::owned_by("a@x.com").id(soup.id);
        assert!(filter.matches(&soup));
        assert!(!ItemFilter::owned_by("b@x.com").id(soup.id).matches(&soup));
        assert!(!filter.clone().name("Salad").matches(&soup));
        assert!(filter.clone().quantity_gt(1).matches(&soup));
        assert!(!filter.clone().quantity_gt(2).matches(&soup));
        assert!(filter.clone().quantity_lt(3).matches(&soup));
        assert!(!filter.quantity_lt(2).matches(&soup));
    }
}
