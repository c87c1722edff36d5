//! Database connection pool management

use anyhow::{Context, Result};
use backoff::ExponentialBackoff;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Settings;

/// Idempotent schema for the three collections
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS cart_items (
        id UUID PRIMARY KEY,
        user_email TEXT NOT NULL,
        name TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 1),
        extra JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS cart_items_user_email_idx ON cart_items (user_email)",
    r#"
    CREATE TABLE IF NOT EXISTS chef_items (
        id UUID PRIMARY KEY,
        user_email TEXT NOT NULL,
        name TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 1),
        extra JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS chef_items_user_email_name_idx ON chef_items (user_email, name)",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        uid TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        photo_url TEXT,
        role TEXT NOT NULL DEFAULT 'user',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS users_email_idx ON users (email)",
];

/// Create a PostgreSQL connection pool, retrying while the database comes up
pub async fn create_pool(settings: &Settings, database_url: &str) -> Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(database_url)
        .context("Invalid DATABASE_URL")?
        .application_name("bistro-boss-backend");

    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..ExponentialBackoff::default()
    };

    let pool = backoff::future::retry(policy, || {
        let connect_options = connect_options.clone();
        let pool_options = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800));

        async move {
            pool_options
                .connect_with(connect_options)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, "PostgreSQL not reachable yet, retrying");
                    backoff::Error::transient(e)
                })
        }
    })
    .await
    .context("Failed to connect to PostgreSQL")?;

    tracing::info!(
        max_connections = settings.database_max_connections,
        "Database connection pool established"
    );

    Ok(pool)
}

/// Create the collection tables if they do not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to apply schema")?;
    }
    tracing::info!("Database schema ready");
    Ok(())
}

/// Lightweight health check for database connectivity
pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").fetch_one(pool).await.is_ok()
}
