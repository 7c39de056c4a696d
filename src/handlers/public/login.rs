// handlers/public/login.rs - POST /login handler

use axum::{extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::verify_password;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::protected::utils::{options_response, ApiJson, FieldErrors};
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;

/// Same message for unknown email and wrong password
const BAD_CREDENTIALS: &str = "Incorrect Details";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
}

/**
 * POST /login - Exchange credentials for a signed token
 *
 * Expected Input:
 * ```json
 * { "email": "string", "password": "string" }
 * ```
 *
 * Expected Output:
 * ```json
 * { "token": "eyJhbGciOiJIUzI1NiI...", "expires_in": 3600 }
 * ```
 *
 * Missing fields answer 422 with `field_errors`; bad credentials answer 422
 * with one generic message.
 */
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let mut errors = FieldErrors::new();
    let email = errors.email("email", payload.email.as_deref());
    let password = payload.password.unwrap_or_default();
    if password.is_empty() {
        errors.add("password", "Required Password");
    }
    errors.finish()?;

    let user = match state.store.find_user_by_email(&email).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound(_)) => {
            warn!("login failed: unknown email");
            return Err(ApiError::unprocessable(BAD_CREDENTIALS));
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&password, &user.password) {
        warn!(user = %user.id, "login failed: password mismatch");
        return Err(ApiError::unprocessable(BAD_CREDENTIALS));
    }

    let token = state.tokens.issue(user.id).map_err(|e| {
        tracing::error!("token signing failed: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    info!(user = %user.id, "login succeeded");
    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_in: state.tokens.ttl().num_seconds(),
    }))
}

pub async fn options() -> impl IntoResponse {
    options_response("OPTIONS, POST")
}
