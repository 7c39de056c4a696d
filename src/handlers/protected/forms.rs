// handlers/protected/forms.rs - /form and /form/:id

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::utils::{location, options_response, parse_id, ApiJson, FieldErrors};
use crate::auth::{Entity, Permission, Subject, Verb};
use crate::database::models::{Form, FormDraft};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;

const fn can(verb: Verb) -> Permission {
    Permission::new(Entity::Form, verb)
}

#[derive(Debug, Deserialize)]
pub struct FormPayload {
    #[serde(rename = "type")]
    pub form_type: Option<String>,
    pub data: Option<Value>,
    pub author_id: Option<i64>,
}

impl FormPayload {
    fn into_draft(self) -> Result<FormDraft, ApiError> {
        let mut errors = FieldErrors::new();
        let form_type = errors.required("type", self.form_type.as_deref(), "Required Form Type");
        let data = errors.data(self.data);
        let author_id = errors.author(self.author_id);
        errors.finish()?;

        Ok(FormDraft {
            form_type,
            data,
            author_id,
        })
    }
}

pub async fn options(State(state): State<AppState>, subject: Subject) -> ApiResult<Value> {
    state.gate(subject).require(can(Verb::Options)).await?;
    Ok(options_response("OPTIONS, GET, POST"))
}

pub async fn list(State(state): State<AppState>, subject: Subject) -> ApiResult<Vec<Form>> {
    state.gate(subject).require(can(Verb::Get)).await?;
    let forms = state.store.list_forms(state.get_limit()).await?;
    Ok(ApiResponse::success(forms))
}

/**
 * POST /form - Store a submitted form
 *
 * Expected Input:
 * ```json
 * { "type": "feedback", "data": { ... }, "author_id": 42 }
 * ```
 *
 * `author_id` must be the caller.
 */
pub async fn create(
    State(state): State<AppState>,
    subject: Subject,
    ApiJson(payload): ApiJson<FormPayload>,
) -> ApiResult<Form> {
    let gate = state.gate(subject);
    gate.require(can(Verb::Post)).await?;

    let draft = payload.into_draft()?;
    gate.require_owner(draft.author_id)?;

    let form = state.store.create_form(draft).await?;
    info!(form = form.id, author = %form.author_id, "form created");
    Ok(ApiResponse::created(form.clone(), location("form", form.id)))
}

pub async fn show(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> ApiResult<Form> {
    let id = parse_id(&id)?;
    state.gate(subject).require(can(Verb::Get)).await?;
    let form = state.store.find_form(id).await?;
    Ok(ApiResponse::success(form))
}

/// PUT /form/:id - the stored author and the body's `author_id` must both be the caller
pub async fn update(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<FormPayload>,
) -> ApiResult<Form> {
    let id = parse_id(&id)?;
    let gate = state.gate(subject);
    gate.require(can(Verb::Put)).await?;

    let existing = state.store.find_form(id).await?;
    gate.require_owner(existing.author_id)?;

    let draft = payload.into_draft()?;
    gate.require_owner(draft.author_id)?;

    let form = state.store.update_form(id, draft).await?;
    Ok(ApiResponse::success(form))
}

pub async fn remove(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let gate = state.gate(subject);
    gate.require(can(Verb::Delete)).await?;

    let existing = state.store.find_form(id).await?;
    gate.require_owner(existing.author_id)?;

    state.store.delete_form(id).await?;
    info!(form = id, by = %subject.id(), "form deleted");
    Ok(ApiResponse::deleted(id))
}
