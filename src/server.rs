use chrono::Duration;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::{verify_catalog, CatalogError, TokenCodec, TokenError};
use crate::config::{AppConfig, ConfigError, DatabaseDriver};
use crate::database::seed::{self, SeedError};
use crate::database::{schema, DatabaseError, DatabaseManager, MemoryStore, PgStore, Store};
use crate::routes::{app, AppState};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("token codec: {0}")]
    Token(#[from] TokenError),

    #[error("database: {0}")]
    Database(#[from] DatabaseError),

    #[error("seeding: {0}")]
    Seed(#[from] SeedError),

    #[error("permission catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Opens the configured store, migrating the schema first for Postgres
pub async fn open_store(config: &AppConfig, reset: bool) -> Result<Arc<dyn Store>, StartupError> {
    match config.database.driver {
        DatabaseDriver::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        DatabaseDriver::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            schema::migrate(&pool, reset).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// Store, seed, catalog check and token codec: everything the router needs
pub async fn build_state(config: AppConfig) -> Result<AppState, StartupError> {
    let ttl_secs = config.security.token_ttl_secs;
    let ttl = Duration::try_seconds(ttl_secs).ok_or(ConfigError::TokenTtlOutOfRange(ttl_secs))?;
    let tokens = TokenCodec::new(&config.security.api_secret, ttl)?;

    let store = open_store(&config, config.seed.reset_on_start).await?;
    seed::run(&*store, config.seed.admin.as_ref(), config.security.bcrypt_cost).await?;
    verify_catalog(&*store).await?;

    Ok(AppState {
        store,
        tokens: Arc::new(tokens),
        config: Arc::new(config),
    })
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), StartupError> {
    let addr = listener.local_addr()?;
    info!("{} listening on http://{}", state.config.api.name, addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
