// handlers/protected/subscriptions.rs - /subscription and /subscription/:id

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::utils::{location, options_response, parse_id, ApiJson, FieldErrors};
use crate::auth::{Entity, Permission, Subject, Verb};
use crate::database::models::profile_link::random_hash;
use crate::database::models::{ProfileLink, Subscription, SubscriptionDraft};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;

const fn can(verb: Verb) -> Permission {
    Permission::new(Entity::Subscription, verb)
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionPayload {
    pub email: Option<String>,
    pub data: Option<Value>,
    pub author_id: Option<i64>,
}

impl SubscriptionPayload {
    fn into_draft(self) -> Result<SubscriptionDraft, ApiError> {
        let mut errors = FieldErrors::new();
        let email = errors.email("email", self.email.as_deref());
        let data = errors.data(self.data);
        let author_id = errors.author(self.author_id);
        errors.finish()?;

        Ok(SubscriptionDraft {
            email,
            data,
            author_id,
        })
    }
}

/// Create answer: the subscription plus the profile link made with it
#[derive(Debug, Serialize)]
pub struct SubscriptionCreated {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub profile_link: ProfileLink,
}

pub async fn options(State(state): State<AppState>, subject: Subject) -> ApiResult<Value> {
    state.gate(subject).require(can(Verb::Options)).await?;
    Ok(options_response("OPTIONS, GET, POST"))
}

pub async fn list(State(state): State<AppState>, subject: Subject) -> ApiResult<Vec<Subscription>> {
    state.gate(subject).require(can(Verb::Get)).await?;
    let rows = state.store.list_subscriptions(state.get_limit()).await?;
    Ok(ApiResponse::success(rows))
}

/**
 * POST /subscription - Subscribe an address
 *
 * Expected Input:
 * ```json
 * { "email": "reader@example.com", "data": { ... }, "author_id": 42 }
 * ```
 *
 * `author_id` must be the caller. A profile link with a random hash is created
 * in the same write; sending the link by mail is left to another service.
 */
pub async fn create(
    State(state): State<AppState>,
    subject: Subject,
    ApiJson(payload): ApiJson<SubscriptionPayload>,
) -> ApiResult<SubscriptionCreated> {
    let gate = state.gate(subject);
    gate.require(can(Verb::Post)).await?;

    let draft = payload.into_draft()?;
    gate.require_owner(draft.author_id)?;

    let (subscription, profile_link) = state.store.create_subscription(draft, random_hash()).await?;
    info!(
        subscription = subscription.id,
        link = profile_link.id,
        "subscription created"
    );

    let url = location("subscription", subscription.id);
    Ok(ApiResponse::created(
        SubscriptionCreated {
            subscription,
            profile_link,
        },
        url,
    ))
}

pub async fn show(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> ApiResult<Subscription> {
    let id = parse_id(&id)?;
    state.gate(subject).require(can(Verb::Get)).await?;
    let subscription = state.store.find_subscription(id).await?;
    Ok(ApiResponse::success(subscription))
}

pub async fn update(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<SubscriptionPayload>,
) -> ApiResult<Subscription> {
    let id = parse_id(&id)?;
    let gate = state.gate(subject);
    gate.require(can(Verb::Put)).await?;

    let existing = state.store.find_subscription(id).await?;
    gate.require_owner(existing.author_id)?;

    let draft = payload.into_draft()?;
    gate.require_owner(draft.author_id)?;

    let subscription = state.store.update_subscription(id, draft).await?;
    Ok(ApiResponse::success(subscription))
}

pub async fn remove(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let gate = state.gate(subject);
    gate.require(can(Verb::Delete)).await?;

    let existing = state.store.find_subscription(id).await?;
    gate.require_owner(existing.author_id)?;

    state.store.delete_subscription(id).await?;
    info!(subscription = id, by = %subject.id(), "subscription deleted");
    Ok(ApiResponse::deleted(id))
}
