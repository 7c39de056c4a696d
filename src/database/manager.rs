use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the stores and the connection manager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness rule was violated; the message is safe to show to clients
    #[error("{0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DatabaseError::NotFound(what.into())
    }

    /// Maps Postgres unique violations (23505) to `Conflict` with a readable message
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                let constraint = db.constraint().unwrap_or_default();
                return DatabaseError::Conflict(conflict_message(constraint));
            }
        }
        DatabaseError::Sqlx(err)
    }

    /// True when the pool could not reach the server at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
                | DatabaseError::Sqlx(sqlx::Error::PoolClosed)
                | DatabaseError::Sqlx(sqlx::Error::Io(_))
        )
    }
}

fn conflict_message(constraint: &str) -> String {
    if constraint.contains("nickname") {
        "Nickname Already Taken".to_string()
    } else if constraint.contains("email") {
        "Email Already Taken".to_string()
    } else if constraint.contains("hash") {
        "Link Already Exists".to_string()
    } else {
        "Record Already Exists".to_string()
    }
}

/// Builds the Postgres pool from configuration
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let connection_string = Self::build_connection_string(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&connection_string)
            .await?;

        info!(database = %config.name, "Created database pool");
        Ok(pool)
    }

    /// DATABASE_URL wins; otherwise the URL is assembled from the DB_* parts.
    /// The database name from config always replaces the URL path.
    fn build_connection_string(config: &DatabaseConfig) -> Result<String, DatabaseError> {
        let mut url = match &config.url {
            Some(base) => url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?,
            None => {
                if config.host.is_empty() {
                    return Err(DatabaseError::ConfigMissing("DB_HOST"));
                }
                let mut url = url::Url::parse("postgres://localhost")
                    .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
                url.set_host(Some(&config.host))
                    .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
                url.set_port(Some(config.port))
                    .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
                url.set_username(&config.user)
                    .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
                if !config.password.is_empty() {
                    url.set_password(Some(&config.password))
                        .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
                }
                url
            }
        };

        if config.url.is_none() || url.path().trim_start_matches('/').is_empty() {
            url.set_path(&format!("/{}", config.name));
        }
        Ok(url.into())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
