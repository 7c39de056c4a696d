// handlers/protected/reports.rs - /subscription-report, /subscription-report/:path, /subscription-report/:id
//
// A report has no author of its own for ownership purposes: it belongs to
// whoever owns the subscription it points at.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::utils::{location, options_response, parse_id, ApiJson, FieldErrors};
use crate::auth::{Entity, Permission, Subject, UserId, Verb};
use crate::database::models::{NewReport, SubscriptionReport};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;

const fn can(verb: Verb) -> Permission {
    Permission::new(Entity::SubscriptionReport, verb)
}

#[derive(Debug, Deserialize)]
pub struct ReportPayload {
    pub path: Option<String>,
    pub author_id: Option<i64>,
    pub profile_id: Option<i64>,
}

/// Author of the subscription a report belongs to
async fn report_owner(state: &AppState, profile_id: i64) -> Result<UserId, ApiError> {
    let subscription = state.store.find_subscription(profile_id).await?;
    Ok(subscription.author_id)
}

pub async fn options(State(state): State<AppState>, subject: Subject) -> ApiResult<Value> {
    state.gate(subject).require(can(Verb::Options)).await?;
    Ok(options_response("OPTIONS, GET, POST"))
}

pub async fn list(
    State(state): State<AppState>,
    subject: Subject,
) -> ApiResult<Vec<SubscriptionReport>> {
    state.gate(subject).require(can(Verb::Get)).await?;
    let reports = state.store.list_reports(state.get_limit()).await?;
    Ok(ApiResponse::success(reports))
}

/**
 * POST /subscription-report - Record a resource a subscriber asked for
 *
 * Expected Input:
 * ```json
 * { "path": "/css/flex", "author_id": 42, "profile_id": 7 }
 * ```
 *
 * The caller must be `author_id` and own subscription `profile_id`.
 */
pub async fn create(
    State(state): State<AppState>,
    subject: Subject,
    ApiJson(payload): ApiJson<ReportPayload>,
) -> ApiResult<SubscriptionReport> {
    let gate = state.gate(subject);
    gate.require(can(Verb::Post)).await?;

    let mut errors = FieldErrors::new();
    let path = errors.required("path", payload.path.as_deref(), "Required Path");
    let author_id = errors.author(payload.author_id);
    let profile_id = errors.reference("profile_id", payload.profile_id, "Required Profile");
    errors.finish()?;
    gate.require_owner(author_id)?;
    gate.require_owner(report_owner(&state, profile_id).await?)?;

    let report = state
        .store
        .create_report(NewReport {
            path,
            author_id,
            profile_id,
        })
        .await?;
    info!(report = report.id, subscription = profile_id, "subscription report created");
    Ok(ApiResponse::created(
        report.clone(),
        location("subscription-report", report.id),
    ))
}

/// GET /subscription-report/:path - newest report for that path
pub async fn show(
    State(state): State<AppState>,
    subject: Subject,
    Path(path): Path<String>,
) -> ApiResult<SubscriptionReport> {
    state.gate(subject).require(can(Verb::Get)).await?;
    let report = state.store.find_report_by_path(&path).await?;
    Ok(ApiResponse::success(report))
}

/// DELETE /subscription-report/:id
pub async fn remove(
    State(state): State<AppState>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let gate = state.gate(subject);
    gate.require(can(Verb::Delete)).await?;

    let existing = state.store.find_report(id).await?;
    gate.require_owner(report_owner(&state, existing.profile_id).await?)?;

    state.store.delete_report(id).await?;
    info!(report = id, by = %subject.id(), "subscription report deleted");
    Ok(ApiResponse::deleted(id))
}
