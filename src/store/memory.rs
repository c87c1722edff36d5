//! In-process collections
//!
//! Used when no `DATABASE_URL` is configured and by the test suite. Each
//! operation takes the collection lock once, so a conditional update is as
//! atomic here as it is in PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    ItemCollection, ItemFilter, ItemPatch, StoreError, StoreResult, UpdateResult, UserCollection,
    UserFilter, UserPatch,
};
use crate::domain::{Item, NewItem, NewUser, User};

#[derive(Default)]
pub struct MemoryItems {
    docs: RwLock<Vec<Item>>,
}

#[async_trait]
impl ItemCollection for MemoryItems {
    async fn find_many(&self, filter: &ItemFilter) -> StoreResult<Vec<Item>> {
        Ok(self
            .docs
            .read()
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn find_one(&self, filter: &ItemFilter) -> StoreResult<Option<Item>> {
        Ok(self.docs.read().iter().find(|item| filter.matches(item)).cloned())
    }

    async fn insert_one(&self, item: NewItem) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        self.docs.write().push(item.into_item(id));
        Ok(id)
    }

    async fn update_one(&self, filter: &ItemFilter, patch: ItemPatch) -> StoreResult<UpdateResult> {
        let mut docs = self.docs.write();
        let Some(item) = docs.iter_mut().find(|item| filter.matches(item)) else {
            return Ok(UpdateResult::default());
        };

        match patch {
            ItemPatch::IncQuantity(delta) => {
                let current = item.quantity;
                item.quantity = current.checked_add(delta).ok_or_else(|| {
                    StoreError::OutOfRange(format!("quantity {} + {}", current, delta))
                })?;
            }
        }

        Ok(UpdateResult {
            matched: 1,
            modified: u64::from(!matches!(patch, ItemPatch::IncQuantity(0))),
        })
    }

    async fn delete_one(&self, filter: &ItemFilter) -> StoreResult<u64> {
        let mut docs = self.docs.write();
        match docs.iter().position(|item| filter.matches(item)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    docs: RwLock<Vec<User>>,
}

#[async_trait]
impl UserCollection for MemoryUsers {
    async fn find_many(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        Ok(self
            .docs
            .read()
            .iter()
            .filter(|user| filter.matches(user))
            .cloned()
            .collect())
    }

    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<User>> {
        Ok(self.docs.read().iter().find(|user| filter.matches(user)).cloned())
    }

    async fn insert_one(&self, user: NewUser) -> StoreResult<Uuid> {
        let mut docs = self.docs.write();
        if docs.iter().any(|existing| existing.uid == user.uid) {
            return Err(StoreError::Conflict(format!("uid {}", user.uid)));
        }

        let id = Uuid::new_v4();
        docs.push(user.into_user(id, Utc::now()));
        Ok(id)
    }

    async fn update_one(&self, filter: &UserFilter, patch: UserPatch) -> StoreResult<UpdateResult> {
        let mut docs = self.docs.write();
        let Some(user) = docs.iter_mut().find(|user| filter.matches(user)) else {
            return Ok(UpdateResult::default());
        };

        let before = user.clone();
        match patch {
            UserPatch::Profile {
                name,
                email,
                photo_url,
            } => {
                if let Some(name) = name {
                    user.name = name;
                }
                if let Some(email) = email {
                    user.email = email;
                }
                if photo_url.is_some() {
                    user.photo_url = photo_url;
                }
            }
            UserPatch::Role(role) => user.role = role,
        }

        let modified = *user != before;
        if modified {
            user.updated_at = Utc::now();
        }

        Ok(UpdateResult {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn delete_one(&self, filter: &UserFilter) -> StoreResult<u64> {
        let mut docs = self.docs.write();
        match docs.iter().position(|user| filter.matches(user)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use serde_json::Map;

    fn soup(email: &str, quantity: i32) -> NewItem {
        NewItem {
            user_email: email.to_string(),
            name: "Soup".to_string(),
            quantity,
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn conditional_decrement_stops_at_floor() {
        let items = MemoryItems::default();
        let id = items.insert_one(soup("a@x.com", 2)).await.unwrap();
        let filter = ItemFilter::owned_by("a@x.com").id(id).quantity_gt(1);

        let first = items.update_one(&filter, ItemPatch::IncQuantity(-1)).await.unwrap();
        let second = items.update_one(&filter, ItemPatch::IncQuantity(-1)).await.unwrap();

        assert_eq!(first, UpdateResult { matched: 1, modified: 1 });
        assert_eq!(second, UpdateResult::default());
        let stored = items.find_one(&ItemFilter::default().id(id)).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 1);
    }

    #[tokio::test]
    async fn increment_past_i32_max_is_an_error() {
        let items = MemoryItems::default();
        let id = items.insert_one(soup("a@x.com", i32::MAX)).await.unwrap();

        let result = items
            .update_one(&ItemFilter::default().id(id), ItemPatch::IncQuantity(1))
            .await;

        assert!(matches!(result, Err(StoreError::OutOfRange(_))));
        let stored = items.find_one(&ItemFilter::default().id(id)).await.unwrap().unwrap();
        assert_eq!(stored.quantity, i32::MAX);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_filter() {
        let items = MemoryItems::default();
        let id = items.insert_one(soup("a@x.com", 1)).await.unwrap();

        assert_eq!(items.delete_one(&ItemFilter::owned_by("b@x.com").id(id)).await.unwrap(), 0);
        assert_eq!(items.delete_one(&ItemFilter::owned_by("a@x.com").id(id)).await.unwrap(), 1);
        assert!(items.find_many(&ItemFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_patch_leaves_role_alone() {
        let users = MemoryUsers::default();
        let id = users
            .insert_one(NewUser {
                uid: "u1".to_string(),
                email: "a@x.com".to_string(),
                name: "A".to_string(),
                photo_url: None,
                role: Role::User,
            })
            .await
            .unwrap();
        users
            .update_one(&UserFilter::by_id(id), UserPatch::Role(Role::Admin))
            .await
            .unwrap();

        let result = users
            .update_one(
                &UserFilter::by_uid("u1"),
                UserPatch::Profile {
                    name: Some("Alice".to_string()),
                    email: None,
                    photo_url: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.modified, 1);
        let user = users.find_one(&UserFilter::by_uid("u1")).await.unwrap().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn duplicate_uid_is_a_conflict() {
        let users = MemoryUsers::default();
        let new_user = |email: &str| NewUser {
            uid: "u1".to_string(),
            email: email.to_string(),
            name: String::new(),
            photo_url: None,
            role: Role::User,
        };

        users.insert_one(new_user("a@x.com")).await.unwrap();
        let second = users.insert_one(new_user("a@x.com")).await;

        assert!(matches!(second, Err(StoreError::Conflict(_))));
        assert_eq!(users.find_many(&UserFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unchanged_profile_reports_no_modification() {
        let users = MemoryUsers::default();
        users
            .insert_one(NewUser {
                uid: "u1".to_string(),
                email: "a@x.com".to_string(),
                name: "A".to_string(),
                photo_url: None,
                role: Role::User,
            })
            .await
            .unwrap();

        let result = users
            .update_one(
                &UserFilter::by_uid("u1"),
                UserPatch::Profile {
                    name: Some("A".to_string()),
                    email: Some("a@x.com".to_string()),
                    photo_url: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(result, UpdateResult { matched: 1, modified: 0 });
    }
}
