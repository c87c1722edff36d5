//! PostgreSQL-backed collections
//!
//! Each collection is one table. Item documents keep their uninterpreted
//! fields in a JSONB `extra` column so arbitrary client payloads survive a
//! round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    ItemCollection, ItemFilter, ItemPatch, StoreError, StoreResult, UpdateResult, UserCollection,
    UserFilter, UserPatch,
};
use crate::domain::{Item, ItemKind, NewItem, NewUser, User};

const ITEM_COLUMNS: &str = "id, user_email, name, quantity, extra";
const USER_COLUMNS: &str = "id, uid, email, name, photo_url, role, created_at, updated_at";

pub fn item_table(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Cart => "cart_items",
        ItemKind::Chef => "chef_items",
    }
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    user_email: String,
    name: String,
    quantity: i32,
    extra: Json<Map<String, Value>>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            user_email: row.user_email,
            name: row.name,
            quantity: row.quantity,
            extra: row.extra.0,
        }
    }
}

fn push_item_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ItemFilter) {
    qb.push(" WHERE TRUE");
    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id);
    }
    if let Some(email) = &filter.user_email {
        qb.push(" AND user_email = ").push_bind(email.clone());
    }
    if let Some(name) = &filter.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(floor) = filter.quantity_gt {
        qb.push(" AND quantity > ").push_bind(floor);
    }
    if let Some(ceiling) = filter.quantity_lt {
        qb.push(" AND quantity < ").push_bind(ceiling);
    }
}

/// Restrict a statement to the first row matching `filter`.
///
/// The predicates are repeated on the outer statement so that PostgreSQL
/// re-checks them against the locked row version under concurrent writers.
fn push_single_row(qb: &mut QueryBuilder<'_, Postgres>, table: &str, filter: &ItemFilter) {
    push_item_filter(qb, filter);
    qb.push(format!(" AND id = (SELECT id FROM {}", table));
    push_item_filter(qb, filter);
    qb.push(" ORDER BY created_at LIMIT 1)");
}

pub struct PgItems {
    pool: PgPool,
    table: &'static str,
}

impl PgItems {
    pub fn new(pool: PgPool, kind: ItemKind) -> Self {
        Self {
            pool,
            table: item_table(kind),
        }
    }
}

#[async_trait]
impl ItemCollection for PgItems {
    async fn find_many(&self, filter: &ItemFilter) -> StoreResult<Vec<Item>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM {}", ITEM_COLUMNS, self.table));
        push_item_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at");

        let rows: Vec<ItemRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn find_one(&self, filter: &ItemFilter) -> StoreResult<Option<Item>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM {}", ITEM_COLUMNS, self.table));
        push_item_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at LIMIT 1");

        let row: Option<ItemRow> = qb.build_query_as().fetch_optional(&self.pool).await?;
        Ok(row.map(Item::from))
    }

    async fn insert_one(&self, item: NewItem) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(&format!(
            "INSERT INTO {} (id, user_email, name, quantity, extra) VALUES ($1, $2, $3, $4, $5)",
            self.table
        ))
        .bind(id)
        .bind(&item.user_email)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(Json(&item.extra))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_one(&self, filter: &ItemFilter, patch: ItemPatch) -> StoreResult<UpdateResult> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", self.table));
        match patch {
            ItemPatch::IncQuantity(delta) => {
                qb.push("quantity = quantity + ").push_bind(delta);
            }
        }
        push_single_row(&mut qb, self.table, filter);

        let affected = qb.build().execute(&self.pool).await?.rows_affected();
        Ok(UpdateResult {
            matched: affected,
            modified: affected,
        })
    }

    async fn delete_one(&self, filter: &ItemFilter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {}", self.table));
        push_single_row(&mut qb, self.table, filter);

        Ok(qb.build().execute(&self.pool).await?.rows_affected())
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    uid: String,
    email: String,
    name: String,
    photo_url: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(StoreError::Corrupt)?;
        Ok(Self {
            id: row.id,
            uid: row.uid,
            email: row.email,
            name: row.name,
            photo_url: row.photo_url,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE TRUE");
    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id);
    }
    if let Some(uid) = &filter.uid {
        qb.push(" AND uid = ").push_bind(uid.clone());
    }
    if let Some(email) = &filter.email {
        qb.push(" AND email = ").push_bind(email.clone());
    }
}

fn push_single_user(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    push_user_filter(qb, filter);
    qb.push(" AND id = (SELECT id FROM users");
    push_user_filter(qb, filter);
    qb.push(" ORDER BY created_at LIMIT 1)");
}

pub struct PgUsers {
    pool: PgPool,
}

impl PgUsers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserCollection for PgUsers {
    async fn find_many(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_user_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at");

        let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_user_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at LIMIT 1");

        let row: Option<UserRow> = qb.build_query_as().fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn insert_one(&self, user: NewUser) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, uid, email, name, photo_url, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.photo_url)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(format!("uid {}", user.uid))
            }
            other => StoreError::Database(other),
        })?;

        Ok(id)
    }

    /// PostgreSQL reports affected rows only, so `modified` equals `matched`.
    async fn update_one(&self, filter: &UserFilter, patch: UserPatch) -> StoreResult<UpdateResult> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        match patch {
            UserPatch::Profile {
                name,
                email,
                photo_url,
            } => {
                qb.push("name = COALESCE(")
                    .push_bind(name)
                    .push(", name), email = COALESCE(")
                    .push_bind(email)
                    .push(", email), photo_url = COALESCE(")
                    .push_bind(photo_url)
                    .push(", photo_url)");
            }
            UserPatch::Role(role) => {
                qb.push("role = ").push_bind(role.as_str());
            }
        }
        qb.push(", updated_at = NOW()");
        push_single_user(&mut qb, filter);

        let affected = qb.build().execute(&self.pool).await?.rows_affected();
        Ok(UpdateResult {
            matched: affected,
            modified: affected,
        })
    }

    async fn delete_one(&self, filter: &UserFilter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM users");
        push_single_user(&mut qb, filter);

        Ok(qb.build().execute(&self.pool).await?.rows_affected())
    }
}
