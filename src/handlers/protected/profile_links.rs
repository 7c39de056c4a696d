// handlers/protected/profile_links.rs - /profile-link, /profile-link/:hash, /profile-link/:id

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::utils::{location, options_response, parse_id, ApiJson, FieldErrors};
use crate::auth::{Entity, Permission, Subject, Verb};
use crate::database::models::{NewProfileLink, ProfileLink};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;

const fn can(verb: Verb) -> Permission {
    Permission::new(Entity::ProfileLink, verb)
}

#[derive(Debug, Deserialize)]
pub struct ProfileLinkPayload {
    /// Optional seed; the stored hash is always derived from it
    pub hash: Option<String>,
    pub author_id: Option<i64>,
    pub profile_id: Option<i64>,
}

pub async fn options(State(state): State<AppState>, subject: Subject) -> ApiResult<Value> {
    state.gate(subject).require(can(Verb::Options)).await?;
    Ok(options_response("OPTIONS, GET, POST"))
}

pub async fn list(State(state): State<AppState>, subject: Subject) -> ApiResult<Vec<ProfileLink>> {
    state.gate(subject).require(can(Verb::Get)).await?;
    let links = state.store.list_links(state.get_limit()).await?;
    Ok(ApiResponse::success(links))
}

/// POST /profile-link - the caller must author the link and own the subscription
pub async fn create(
    State(state): State<AppState>,
    subject: Subject,
    ApiJson(payload): ApiJson<ProfileLinkPayload>,
) -> ApiResult<ProfileLink> {
    let gate = state.gate(subject);
    gate.require(can(Verb::Post)).await?;

    let mut errors = FieldErrors::new();
    let author_id = errors.author(payload.author_id);
    let profile_id = errors.reference("profile_id", payload.profile_id, "Required Profile");
    errors.finish()?;
    gate.require_owner(author_id)?;

    let subscription = state.store.find_subscription(profile_id).await?;
    gate.require_owner(subscription.author_id)?;

    let link = state
        .store
        .create_link(NewProfileLink::new(payload.hash.as_deref(), author_id, profile_id))
        .await?;
    info!(link = link.id, subscription = profile_id, "profile link created");
    Ok(ApiResponse::created(link.clone(), location("profile-link", link.id)))
}

/// GET /profile-link/:hash
pub async fn show(
    State(state): State<AppState>,
    subject: Subject,
    Path(hash): Path<String>,
) -> ApiResult<ProfileLink> {
    state.gate(subject).require(can(Verb::Get)).await?;
    let link = state.store.find_link_by_hash(hash.trim()).await?;
    Ok(ApiResponse::success(link))
}

/// DELETE /profile-link/:id
pub async fn remove(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let gate = state.gate(subject);
    gate.require(can(Verb::Delete)).await?;

    let existing = state.store.find_link(id).await?;
    gate.require_owner(existing.author_id)?;

    state.store.delete_link(id).await?;
    info!(link = id, by = %subject.id(), "profile link deleted");
    Ok(ApiResponse::deleted(id))
}
