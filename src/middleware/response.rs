use axum::{
    http::{header::LOCATION, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Successful response: the resource JSON itself plus optional headers
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    pub headers: Vec<(HeaderName, String)>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self::with_status(data, StatusCode::OK)
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code,
            headers: Vec::new(),
        }
    }

    /// 201 Created with a Location header
    pub fn created(data: T, location: impl Into<String>) -> Self {
        Self::with_status(data, StatusCode::CREATED).header(LOCATION, location)
    }

    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

impl ApiResponse<()> {
    /// 204 No Content; `Entity` names the deleted row
    pub fn deleted(id: i64) -> Self {
        ApiResponse::with_status((), StatusCode::NO_CONTENT)
            .header(HeaderName::from_static("entity"), id.to_string())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut response = if self.status_code == StatusCode::NO_CONTENT {
            self.status_code.into_response()
        } else {
            match serde_json::to_value(&self.data) {
                Ok(value) => (self.status_code, Json(value)).into_response(),
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Failed to serialize response data" })),
                    )
                        .into_response();
                }
            }
        };

        for (name, value) in self.headers {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    response.headers_mut().insert(name, value);
                }
                Err(_) => tracing::warn!(header = %name, "dropping non-ASCII header value"),
            }
        }
        response
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
