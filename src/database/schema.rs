use sqlx::PgPool;
use tracing::{info, warn};

use super::DatabaseError;

/// Drop order: dependents first
const TABLES: [&str; 9] = [
    "subscription_reports",
    "profile_links",
    "subscriptions",
    "forms",
    "group_permissions",
    "grouped_users",
    "permissions",
    "user_groups",
    "users",
];

const CREATE: [&str; 9] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        nickname VARCHAR(255) NOT NULL CONSTRAINT users_nickname_key UNIQUE,
        email VARCHAR(100) NOT NULL CONSTRAINT users_email_key UNIQUE,
        password VARCHAR(100) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS user_groups (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE,
        email VARCHAR(100) NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS permissions (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS grouped_users (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
        group_id BIGINT NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE ON UPDATE CASCADE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS group_permissions (
        id BIGSERIAL PRIMARY KEY,
        group_id BIGINT NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE ON UPDATE CASCADE,
        permission_id BIGINT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE ON UPDATE CASCADE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS forms (
        id BIGSERIAL PRIMARY KEY,
        type VARCHAR(255) NOT NULL,
        data JSONB NOT NULL,
        author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS subscriptions (
        id BIGSERIAL PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        data JSONB NOT NULL,
        author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS profile_links (
        id BIGSERIAL PRIMARY KEY,
        hash VARCHAR(255) NOT NULL CONSTRAINT profile_links_hash_key UNIQUE,
        author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
        profile_id BIGINT NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE ON UPDATE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS subscription_reports (
        id BIGSERIAL PRIMARY KEY,
        path VARCHAR(255) NOT NULL,
        author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
        profile_id BIGINT NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE ON UPDATE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];

/// Creates the tables if missing; with `reset`, drops everything first
pub async fn migrate(pool: &PgPool, reset: bool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;

    if reset {
        warn!("Dropping all tables before migration");
        for table in TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", table))
                .execute(&mut *tx)
                .await?;
        }
    }

    for statement in CREATE {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    info!(reset, "Schema migrated");
    Ok(())
}
