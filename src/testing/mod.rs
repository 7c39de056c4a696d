//! Fixtures shared by the unit tests: an in-memory permission graph and a
//! ready-made router state.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::{hash_password, TokenCodec, UserId};
use crate::config::AppConfig;
use crate::database::models::{NewUser, UserGroup};
use crate::database::seed::MEMBER_GROUP;
use crate::database::{seed, AccessStore, DatabaseError, MemoryStore};
use crate::routes::AppState;

pub const TEST_SECRET: &str = "test-secret-key-12345";

/// User 42 belongs to group 2; group 2 holds FORM-DELETE and nothing else
pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.put_group(2, "editors").await;
    store.put_user(42, "reader42", "x").await;

    let form_delete = store.ensure_permission("FORM-DELETE").await.unwrap();
    store.ensure_permission("USER-DELETE").await.unwrap();
    store.grant_permission(2, form_delete).await.unwrap();
    store.add_user_to_group(UserId(42), 2).await.unwrap();
    store
}

/// Router state over a fully seeded memory store
pub async fn app_state() -> AppState {
    let config = AppConfig::from_vars(|key| (key == "BCRYPT_COST").then(|| "4".to_string())).unwrap();
    let store = MemoryStore::new();
    seed::run(&store, None, 4).await.unwrap();

    AppState {
        store: Arc::new(store),
        tokens: Arc::new(codec()),
        config: Arc::new(config),
    }
}

/// Creates `nickname` in the member group and returns its id with a fresh token
pub async fn member(state: &AppState, nickname: &str, password: &str) -> (UserId, String) {
    let user = state
        .store
        .create_user(NewUser {
            nickname: nickname.to_string(),
            email: format!("{nickname}@example.com"),
            password: hash_password(password, 4).unwrap(),
        })
        .await
        .unwrap();
    let group = state.store.find_group(MEMBER_GROUP).await.unwrap().unwrap();
    state.store.add_user_to_group(user.id, group.id).await.unwrap();

    let token = state.tokens.issue(user.id).unwrap();
    (user.id, token)
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET, Duration::hours(1)).unwrap()
}

/// Wraps an access store, counting resolver queries and optionally failing them
pub struct CountingStore<S> {
    pub inner: S,
    queries: AtomicUsize,
    fail: bool,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing(inner: S) -> Self {
        Self {
            fail: true,
            ..Self::new(inner)
        }
    }

    pub fn permission_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: AccessStore> AccessStore for CountingStore<S> {
    async fn user_has_permission(&self, user: UserId, permission: &str) -> Result<bool, DatabaseError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DatabaseError::QueryError("connection reset".into()));
        }
        self.inner.user_has_permission(user, permission).await
    }

    async fn permission_names(&self) -> Result<Vec<String>, DatabaseError> {
        self.inner.permission_names().await
    }

    async fn ensure_permission(&self, name: &str) -> Result<i64, DatabaseError> {
        self.inner.ensure_permission(name).await
    }

    async fn ensure_group(&self, name: &str, email: &str) -> Result<i64, DatabaseError> {
        self.inner.ensure_group(name, email).await
    }

    async fn find_group(&self, name: &str) -> Result<Option<UserGroup>, DatabaseError> {
        self.inner.find_group(name).await
    }

    async fn grant_permission(&self, group_id: i64, permission_id: i64) -> Result<(), DatabaseError> {
        self.inner.grant_permission(group_id, permission_id).await
    }

    async fn add_user_to_group(&self, user: UserId, group_id: i64) -> Result<(), DatabaseError> {
        self.inner.add_user_to_group(user, group_id).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }
}
