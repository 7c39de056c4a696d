// handlers/protected/users.rs - /user and /user/:id

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::utils::{location, options_response, parse_id, ApiJson, FieldErrors};
use crate::auth::{hash_password, Entity, Permission, Subject, UserId, Verb};
use crate::database::models::{NewUser, User};
use crate::database::seed::MEMBER_GROUP;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;

const fn can(verb: Verb) -> Permission {
    Permission::new(Entity::User, verb)
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserPayload {
    /// Validates and hashes; the password is always required
    fn into_new_user(self, bcrypt_cost: u32) -> Result<NewUser, ApiError> {
        let mut errors = FieldErrors::new();
        let nickname = errors.required("nickname", self.nickname.as_deref(), "Required Nickname");
        let email = errors.email("email", self.email.as_deref());
        let password = self.password.unwrap_or_default();
        if password.is_empty() {
            errors.add("password", "Required Password");
        }
        errors.finish()?;

        let password = hash_password(&password, bcrypt_cost).map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            ApiError::internal_server_error("Failed to store password")
        })?;

        Ok(NewUser {
            nickname,
            email,
            password,
        })
    }
}

pub async fn options(State(state): State<AppState>, subject: Subject) -> ApiResult<serde_json::Value> {
    state.gate(subject).require(can(Verb::Options)).await?;
    Ok(options_response("OPTIONS, GET, POST"))
}

pub async fn list(State(state): State<AppState>, subject: Subject) -> ApiResult<Vec<User>> {
    state.gate(subject).require(can(Verb::Get)).await?;
    let users = state.store.list_users(state.get_limit()).await?;
    Ok(ApiResponse::success(users))
}

/// POST /user - create an account; it joins the default member group
pub async fn create(
    State(state): State<AppState>,
    subject: Subject,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<User> {
    state.gate(subject).require(can(Verb::Post)).await?;

    let new_user = payload.into_new_user(state.config.security.bcrypt_cost)?;
    let user = state.store.create_user(new_user).await?;

    match state.store.find_group(MEMBER_GROUP).await? {
        Some(group) => state.store.add_user_to_group(user.id, group.id).await?,
        None => warn!(user = %user.id, "member group missing; new user holds no permissions"),
    }

    info!(user = %user.id, by = %subject.id(), "user created");
    Ok(ApiResponse::created(user.clone(), location("user", user.id.0)))
}

pub async fn show(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let id = parse_id(&id)?;
    state.gate(subject).require(can(Verb::Get)).await?;
    let user = state.store.find_user(UserId(id)).await?;
    Ok(ApiResponse::success(user))
}

/**
 * PUT /user/:id - Update own profile
 *
 * Requires USER-PUT and the caller must be `:id`. The password is re-hashed.
 */
pub async fn update(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<User> {
    let id = UserId(parse_id(&id)?);
    let gate = state.gate(subject);
    gate.require_owned(can(Verb::Put), id).await?;

    let changes = payload.into_new_user(state.config.security.bcrypt_cost)?;
    let user = state.store.update_user(id, changes).await?;
    Ok(ApiResponse::success(user))
}

pub async fn remove(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = UserId(parse_id(&id)?);
    state.gate(subject).require_owned(can(Verb::Delete), id).await?;

    state.store.delete_user(id).await?;
    info!(user = %id, "user deleted");
    Ok(ApiResponse::deleted(id.0))
}
