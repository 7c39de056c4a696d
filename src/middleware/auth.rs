use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{AuthError, Subject, TokenCodec};
use crate::error::ApiError;
use crate::routes::AppState;

/// Token authentication middleware: validates the bearer token and stores the
/// `Subject` in request extensions. Any failure answers 401 without running the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let subject = authenticate(request.headers(), &state.tokens).map_err(|e| {
        warn!(path = %request.uri().path(), reason = %e, "rejected unauthenticated request");
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

/// Extract the subject from the Authorization header
pub fn authenticate(headers: &HeaderMap, tokens: &TokenCodec) -> Result<Subject, AuthError> {
    let token = extract_bearer(headers)?;
    let user_id = tokens.validate(token)?;
    debug!(user = %user_id, "token validated");
    Ok(Subject(user_id))
}

/// Extract the raw token from `Authorization: Bearer <token>`
fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::MalformedToken)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedToken),
    }
}

/// Handlers take `Subject` directly. Behind `require_auth` it comes from the
/// extensions; elsewhere the token is validated inline.
#[async_trait]
impl FromRequestParts<AppState> for Subject {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(subject) = parts.extensions.get::<Subject>() {
            return Ok(*subject);
        }

        authenticate(&parts.headers, &state.tokens).map_err(|e| {
            warn!(path = %parts.uri.path(), reason = %e, "rejected unauthenticated request");
            ApiError::from(e)
        })
    }
}
